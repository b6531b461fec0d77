//! Recording dispatch via the external streamlink binary.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use chrono::Local;
use tracing::info;

use crate::channel::{Channel, Platform};
use crate::error::WatchError;
use crate::process;

/// One recording attempt for a live channel, created at dispatch time.
#[derive(Debug, Clone)]
pub struct RecordingJob {
    pub channel: Channel,
    /// Resolved playable URL when the liveness check produced one.
    pub stream_url: Option<String>,
    pub output_path: PathBuf,
}

impl RecordingJob {
    /// Build a job with a collision-free output path under `output_dir`:
    /// platform, channel identifier, and a full timestamp.
    pub fn new(channel: Channel, stream_url: Option<String>, output_dir: &Path) -> Self {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let file_name = format!("{}_{}.ts", channel.file_stem(), timestamp);
        Self {
            channel,
            stream_url,
            output_path: output_dir.join(file_name),
        }
    }
}

/// Capability for running a recording to completion.
#[async_trait]
pub trait Recorder: Send + Sync + 'static {
    async fn record(&self, job: &RecordingJob) -> Result<(), WatchError>;
}

/// Recorder that shells out to streamlink and blocks its own task until
/// the stream ends.
#[derive(Debug, Clone)]
pub struct StreamlinkRecorder {
    binary_path: String,
    quality: String,
    hls_live_edge: u32,
    cookies_file: PathBuf,
}

impl StreamlinkRecorder {
    pub fn new(
        binary_path: impl Into<String>,
        quality: impl Into<String>,
        hls_live_edge: u32,
        cookies_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            binary_path: binary_path.into(),
            quality: quality.into(),
            hls_live_edge,
            cookies_file: cookies_file.into(),
        }
    }

    /// Streamlink argument vector for `job`.
    ///
    /// Twitch is addressed by channel reference; YouTube by the resolved
    /// stream URL plus the session cookie file.
    fn build_args(&self, job: &RecordingJob) -> Vec<String> {
        let mut args = Vec::new();

        if job.channel.platform == Platform::Youtube {
            args.push("--http-cookies".to_string());
            args.push(format!("cookies.txt={}", self.cookies_file.display()));
        }

        args.push("--hls-live-edge".to_string());
        args.push(self.hls_live_edge.to_string());

        let target = match job.channel.platform {
            Platform::Twitch => format!("twitch.tv/{}", job.channel.name),
            Platform::Youtube => job
                .stream_url
                .clone()
                .unwrap_or_else(|| job.channel.page_url()),
        };
        args.push(target);
        args.push(self.quality.clone());

        args.push("-o".to_string());
        args.push(job.output_path.display().to_string());

        args
    }
}

#[async_trait]
impl Recorder for StreamlinkRecorder {
    async fn record(&self, job: &RecordingJob) -> Result<(), WatchError> {
        if let Some(parent) = job.output_path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let args = self.build_args(job);
        info!(
            channel = %job.channel,
            output = %job.output_path.display(),
            "starting streamlink"
        );

        let mut cmd = process::command(&self.binary_path);
        cmd.args(&args).stdout(Stdio::piped()).stderr(Stdio::piped());

        let output = cmd.output().await?;
        if output.status.success() {
            info!(
                channel = %job.channel,
                output = %job.output_path.display(),
                "recording finished"
            );
            Ok(())
        } else {
            Err(WatchError::Process {
                tool: "streamlink".to_string(),
                code: output.status.code().unwrap_or(-1),
                stderr: process::output_tail(&output.stderr, 8),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn recorder() -> StreamlinkRecorder {
        StreamlinkRecorder::new("streamlink", "best", 3, "/etc/recwatch/cookies.txt")
    }

    #[test]
    fn twitch_args_use_channel_reference_without_cookies() {
        let job = RecordingJob {
            channel: Channel::new(Platform::Twitch, "streamer1"),
            stream_url: None,
            output_path: PathBuf::from("downloads/twitch_streamer1_20240309_021127.ts"),
        };
        let args = recorder().build_args(&job);
        assert_eq!(
            args,
            vec![
                "--hls-live-edge".to_string(),
                "3".to_string(),
                "twitch.tv/streamer1".to_string(),
                "best".to_string(),
                "-o".to_string(),
                "downloads/twitch_streamer1_20240309_021127.ts".to_string(),
            ]
        );
    }

    #[test]
    fn youtube_args_use_resolved_url_and_cookie_file() {
        let job = RecordingJob {
            channel: Channel::new(Platform::Youtube, "@somehandle"),
            stream_url: Some("https://cdn.example.com/live.m3u8".to_string()),
            output_path: PathBuf::from("downloads/out.ts"),
        };
        let args = recorder().build_args(&job);
        assert_eq!(args[0], "--http-cookies");
        assert_eq!(args[1], "cookies.txt=/etc/recwatch/cookies.txt");
        assert!(args.contains(&"https://cdn.example.com/live.m3u8".to_string()));
        assert!(!args.contains(&"https://www.youtube.com/@somehandle/live".to_string()));
    }

    #[test]
    fn youtube_args_fall_back_to_live_page() {
        let job = RecordingJob {
            channel: Channel::new(Platform::Youtube, "@somehandle"),
            stream_url: None,
            output_path: PathBuf::from("downloads/out.ts"),
        };
        let args = recorder().build_args(&job);
        assert!(args.contains(&"https://www.youtube.com/@somehandle/live".to_string()));
    }

    #[test]
    fn job_path_embeds_platform_channel_and_timestamp() {
        let dir = TempDir::new().unwrap();
        let job = RecordingJob::new(
            Channel::new(Platform::Youtube, "@somehandle"),
            None,
            dir.path(),
        );

        let name = job.output_path.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("youtube_somehandle_"));
        assert!(name.ends_with(".ts"));
        // platform + name + date + time, separated by underscores
        assert_eq!(name.matches('_').count(), 3);
        assert!(job.output_path.starts_with(dir.path()));
    }
}
