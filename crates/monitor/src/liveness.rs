//! Per-platform liveness detection.
//!
//! Twitch liveness comes from the helix streams lookup; YouTube liveness
//! from resolving the channel's `/live` page with yt-dlp. Failures are
//! contained here: a broken check reports the channel as offline and
//! never aborts the cycle or other channels' checks.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::auth::CredentialCache;
use crate::channel::{Channel, Platform};
use crate::error::WatchError;
use crate::process;

const HELIX_STREAMS_ENDPOINT: &str = "https://api.twitch.tv/helix/streams";

/// Outcome of a liveness check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveStatus {
    Offline,
    /// Channel is broadcasting. `stream_url` is set when the check also
    /// resolved the playable URL.
    Live { stream_url: Option<String> },
}

impl LiveStatus {
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live { .. })
    }
}

/// Capability for checking whether a channel is currently broadcasting.
///
/// Implementations contain their own failures and report `Offline`
/// instead of propagating errors.
#[async_trait]
pub trait LivenessProbe: Send + Sync + 'static {
    async fn check(&self, channel: &Channel) -> LiveStatus;
}

#[derive(Debug, Deserialize)]
pub(crate) struct StreamsResponse {
    pub(crate) data: Vec<StreamEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StreamEntry {
    #[serde(default)]
    pub(crate) user_login: String,
    #[serde(default)]
    pub(crate) title: String,
}

/// Production probe: helix lookup for Twitch, yt-dlp resolution for
/// YouTube.
pub struct PlatformProbe {
    client: reqwest::Client,
    credentials: Arc<CredentialCache>,
    client_id: String,
    ytdlp_path: String,
    cookies_file: PathBuf,
}

impl PlatformProbe {
    pub fn new(
        client: reqwest::Client,
        credentials: Arc<CredentialCache>,
        client_id: impl Into<String>,
        ytdlp_path: impl Into<String>,
        cookies_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            client,
            credentials,
            client_id: client_id.into(),
            ytdlp_path: ytdlp_path.into(),
            cookies_file: cookies_file.into(),
        }
    }

    /// Live iff the streams lookup returns a non-empty result set.
    /// Auth failures fail closed to offline until the next successful
    /// token refresh.
    async fn check_twitch(&self, channel: &Channel) -> Result<LiveStatus, WatchError> {
        let token = self.credentials.bearer().await?;

        let response: StreamsResponse = self
            .client
            .get(HELIX_STREAMS_ENDPOINT)
            .query(&[("user_login", channel.name.as_str())])
            .header("Client-Id", &self.client_id)
            .bearer_auth(&token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match response.data.first() {
            Some(entry) => {
                debug!(channel = %channel, login = %entry.user_login, title = %entry.title, "helix reports live");
                Ok(LiveStatus::Live { stream_url: None })
            }
            None => Ok(LiveStatus::Offline),
        }
    }

    /// Live iff yt-dlp exits successfully and prints a resolved URL for
    /// the channel's `/live` page.
    async fn check_youtube(&self, channel: &Channel) -> Result<LiveStatus, WatchError> {
        let mut cmd = process::command(&self.ytdlp_path);
        cmd.arg("--cookies")
            .arg(&self.cookies_file)
            .arg("--get-url")
            .arg(channel.page_url())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let output = cmd.output().await?;
        if !output.status.success() {
            debug!(
                channel = %channel,
                stderr = %process::output_tail(&output.stderr, 4),
                "yt-dlp found no live stream"
            );
            return Ok(LiveStatus::Offline);
        }

        let url = String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
        if url.is_empty() {
            return Ok(LiveStatus::Offline);
        }

        debug!(channel = %channel, url = %url, "resolved live stream url");
        Ok(LiveStatus::Live {
            stream_url: Some(url),
        })
    }
}

#[async_trait]
impl LivenessProbe for PlatformProbe {
    async fn check(&self, channel: &Channel) -> LiveStatus {
        let result = match channel.platform {
            Platform::Twitch => self.check_twitch(channel).await,
            Platform::Youtube => self.check_youtube(channel).await,
        };

        match result {
            Ok(status) => status,
            Err(e) => {
                warn!(channel = %channel, error = %e, "liveness check failed; treating as offline");
                LiveStatus::Offline
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_channel_has_nonempty_result_set() {
        let raw = r#"{
            "data": [{
                "id": "40952121085",
                "user_id": "101051819",
                "user_login": "streamer1",
                "user_name": "Streamer1",
                "type": "live",
                "title": "late night speedruns",
                "viewer_count": 1204,
                "started_at": "2024-03-09T02:11:27Z"
            }],
            "pagination": {}
        }"#;
        let parsed: StreamsResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.data.len(), 1);
        assert_eq!(parsed.data[0].user_login, "streamer1");
    }

    #[test]
    fn offline_channel_has_empty_result_set() {
        let parsed: StreamsResponse =
            serde_json::from_str(r#"{"data": [], "pagination": {}}"#).unwrap();
        assert!(parsed.data.is_empty());
    }

    #[test]
    fn live_status_predicate() {
        assert!(!LiveStatus::Offline.is_live());
        assert!(LiveStatus::Live { stream_url: None }.is_live());
        assert!(
            LiveStatus::Live {
                stream_url: Some("https://example.com/live.m3u8".to_string())
            }
            .is_live()
        );
    }
}
