//! Validated runtime configuration.
//!
//! All knobs are supplied at process start (CLI flags or environment);
//! there is no runtime reconfiguration.

use std::path::PathBuf;
use std::time::Duration;

use crate::channel::{Channel, Platform};
use crate::error::WatchError;

/// Everything the monitor needs to run.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub twitch_client_id: String,
    pub twitch_client_secret: String,
    /// Channels in declared polling order.
    pub channels: Vec<Channel>,
    pub poll_interval: Duration,
    /// Worker pool size shared by liveness checks and downloads.
    pub max_concurrent_downloads: usize,
    /// Quality selector passed to the recorder.
    pub quality: String,
    pub output_dir: PathBuf,
    /// Cookie file handed to yt-dlp and streamlink for YouTube sessions.
    pub cookies_file: PathBuf,
    /// How close to the broadcast's live point the recorder starts.
    pub hls_live_edge: u32,
    pub streamlink_path: String,
    pub ytdlp_path: String,
}

impl MonitorConfig {
    /// Channel list in declared order: Twitch entries first, then YouTube.
    /// Blank entries from stray separators are dropped.
    pub fn build_channels(twitch: &[String], youtube: &[String]) -> Vec<Channel> {
        twitch
            .iter()
            .map(|name| Channel::new(Platform::Twitch, name.trim()))
            .chain(
                youtube
                    .iter()
                    .map(|name| Channel::new(Platform::Youtube, name.trim())),
            )
            .filter(|channel| !channel.name.is_empty())
            .collect()
    }

    /// Fail fast on configuration the loop cannot run with.
    pub fn validate(&self) -> Result<(), WatchError> {
        if self.channels.is_empty() {
            return Err(WatchError::InvalidConfig(
                "no channels configured".to_string(),
            ));
        }
        if self.max_concurrent_downloads == 0 {
            return Err(WatchError::InvalidConfig(
                "max concurrent downloads must be greater than 0".to_string(),
            ));
        }
        if !self.cookies_file.exists() {
            return Err(WatchError::InvalidConfig(format!(
                "cookies file {} not found",
                self.cookies_file.display()
            )));
        }
        Ok(())
    }
}
