//! The polling/dispatch loop.
//!
//! Alternates between POLLING and SLEEPING forever: each cycle checks
//! every idle channel through the bounded worker pool and dispatches a
//! recording task for each one that is live. Downloads are never awaited
//! by the loop; they run in a long-lived task set, each holding a pool
//! permit and a registry claim for its whole lifetime.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::channel::Channel;
use crate::config::MonitorConfig;
use crate::liveness::{LiveStatus, LivenessProbe};
use crate::recorder::{Recorder, RecordingJob};
use crate::registry::ActiveDownloads;

/// Drives periodic liveness polling and bounded recording dispatch.
pub struct Scheduler {
    channels: Vec<Channel>,
    poll_interval: Duration,
    output_dir: PathBuf,
    probe: Arc<dyn LivenessProbe>,
    recorder: Arc<dyn Recorder>,
    registry: Arc<ActiveDownloads>,
    pool: Arc<Semaphore>,
    downloads: JoinSet<()>,
    shutdown: CancellationToken,
}

impl Scheduler {
    pub fn new(
        config: &MonitorConfig,
        probe: Arc<dyn LivenessProbe>,
        recorder: Arc<dyn Recorder>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            channels: config.channels.clone(),
            poll_interval: config.poll_interval,
            output_dir: config.output_dir.clone(),
            probe,
            recorder,
            registry: ActiveDownloads::new(),
            pool: Arc::new(Semaphore::new(config.max_concurrent_downloads)),
            downloads: JoinSet::new(),
            shutdown,
        }
    }

    /// Registry handle, for status logging and tests.
    pub fn registry(&self) -> Arc<ActiveDownloads> {
        Arc::clone(&self.registry)
    }

    /// Poll all channels forever, sleeping `poll_interval` between
    /// cycles, until the shutdown token fires.
    pub async fn run(&mut self) {
        info!(
            channels = self.channels.len(),
            interval_secs = self.poll_interval.as_secs(),
            "starting stream monitoring"
        );

        loop {
            if self.shutdown.is_cancelled() {
                break;
            }
            self.run_cycle().await;

            debug!(secs = self.poll_interval.as_secs(), "cycle complete; sleeping");
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        let in_flight = self.registry.len();
        if in_flight > 0 {
            warn!(
                in_flight,
                "stopping with recordings still running; leaving them to finish on their own"
            );
        }
        info!("monitoring stopped");
    }

    /// One POLLING state: reap finished downloads, check every idle
    /// channel, dispatch a recording for each live one.
    ///
    /// Checks run as pool sub-tasks and are awaited before the cycle
    /// ends; downloads are not.
    pub async fn run_cycle(&mut self) {
        self.reap_finished();

        let mut checks: JoinSet<Option<(Channel, Option<String>)>> = JoinSet::new();
        for channel in self.channels.clone() {
            if self.registry.contains(&channel.key()) {
                info!(channel = %channel, "already downloading; skipping check");
                continue;
            }

            let probe = Arc::clone(&self.probe);
            let pool = Arc::clone(&self.pool);
            checks.spawn(async move {
                let _permit = match pool.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return None,
                };
                match probe.check(&channel).await {
                    LiveStatus::Live { stream_url } => Some((channel, stream_url)),
                    LiveStatus::Offline => {
                        info!(channel = %channel, "not live");
                        None
                    }
                }
            });
        }

        while let Some(joined) = checks.join_next().await {
            match joined {
                Ok(Some((channel, stream_url))) => self.dispatch(channel, stream_url),
                Ok(None) => {}
                Err(e) => error!(error = %e, "liveness check task failed"),
            }
        }
    }

    /// Claim the channel and submit a download task to the pool. The
    /// task waits for a free worker when all permits are held.
    fn dispatch(&mut self, channel: Channel, stream_url: Option<String>) {
        let Some(claim) = self.registry.claim(channel.key()) else {
            info!(channel = %channel, "already downloading; skipping dispatch");
            return;
        };

        let recorder = Arc::clone(&self.recorder);
        let pool = Arc::clone(&self.pool);
        let output_dir = self.output_dir.clone();

        self.downloads.spawn(async move {
            // Held until the task ends, on every exit path.
            let _claim = claim;

            let Ok(_permit) = pool.acquire_owned().await else {
                return;
            };

            let job = RecordingJob::new(channel.clone(), stream_url, &output_dir);
            if let Err(e) = recorder.record(&job).await {
                error!(channel = %channel, error = %e, "recording failed");
            }
        });
    }

    /// Collect download tasks that have already finished.
    fn reap_finished(&mut self) {
        while let Some(result) = self.downloads.try_join_next() {
            if let Err(e) = result
                && e.is_panic()
            {
                error!(error = %e, "download task panicked");
            }
        }
    }

    /// Wait for every in-flight download task to finish. Used for
    /// orderly teardown and in tests.
    pub async fn join_downloads(&mut self) {
        while let Some(result) = self.downloads.join_next().await {
            if let Err(e) = result
                && e.is_panic()
            {
                error!(error = %e, "download task panicked");
            }
        }
    }
}
