//! Core library for recwatch.
//!
//! Polls a fixed set of Twitch and YouTube channels, detects live
//! broadcasts, and dispatches one external recording process per live
//! channel through a bounded worker pool. An in-memory registry of
//! in-flight downloads suppresses duplicate recordings of the same
//! channel.

pub mod auth;
pub mod channel;
pub mod config;
pub mod error;
pub mod liveness;
pub mod process;
pub mod recorder;
pub mod registry;
pub mod scheduler;

pub use channel::{Channel, ChannelKey, Platform};
pub use config::MonitorConfig;
pub use error::WatchError;
pub use liveness::{LiveStatus, LivenessProbe, PlatformProbe};
pub use recorder::{Recorder, RecordingJob, StreamlinkRecorder};
pub use registry::{ActiveDownloads, DownloadClaim};
pub use scheduler::Scheduler;
