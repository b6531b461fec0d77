//! In-memory set of channels with a download in flight.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::channel::ChannelKey;

/// Shared set of in-flight downloads.
///
/// A key is present exactly while the download task that claimed it is
/// alive; dropping the [`DownloadClaim`] removes it again.
#[derive(Debug, Default)]
pub struct ActiveDownloads {
    inner: Mutex<HashSet<ChannelKey>>,
}

impl ActiveDownloads {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn contains(&self, key: &ChannelKey) -> bool {
        self.inner.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Atomically claim `key`. Returns `None` when a download for the
    /// channel is already in flight.
    pub fn claim(self: &Arc<Self>, key: ChannelKey) -> Option<DownloadClaim> {
        if self.inner.lock().insert(key.clone()) {
            Some(DownloadClaim {
                registry: Arc::clone(self),
                key,
            })
        } else {
            None
        }
    }
}

/// RAII claim on a channel; releases the registry entry on drop, on
/// every exit path of the owning task.
#[derive(Debug)]
pub struct DownloadClaim {
    registry: Arc<ActiveDownloads>,
    key: ChannelKey,
}

impl DownloadClaim {
    pub fn key(&self) -> &ChannelKey {
        &self.key
    }
}

impl Drop for DownloadClaim {
    fn drop(&mut self) {
        self.registry.inner.lock().remove(&self.key);
        debug!(channel = %self.key, "released download slot");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{Channel, Platform};

    fn key(name: &str) -> ChannelKey {
        Channel::new(Platform::Twitch, name).key()
    }

    #[test]
    fn claim_inserts_and_drop_releases() {
        let registry = ActiveDownloads::new();
        let claim = registry.claim(key("streamer1")).unwrap();

        assert!(registry.contains(claim.key()));
        assert_eq!(registry.len(), 1);

        drop(claim);
        assert!(registry.is_empty());
    }

    #[test]
    fn duplicate_claim_is_refused_while_held() {
        let registry = ActiveDownloads::new();
        let _claim = registry.claim(key("streamer1")).unwrap();

        assert!(registry.claim(key("streamer1")).is_none());

        // A different channel is unaffected.
        assert!(registry.claim(key("streamer2")).is_some());
    }

    #[test]
    fn channel_can_be_reclaimed_after_release() {
        let registry = ActiveDownloads::new();
        drop(registry.claim(key("streamer1")).unwrap());
        assert!(registry.claim(key("streamer1")).is_some());
    }

    #[tokio::test]
    async fn panicking_task_still_releases_its_claim() {
        let registry = ActiveDownloads::new();
        let claim = registry.claim(key("streamer1")).unwrap();

        let handle = tokio::spawn(async move {
            let _claim = claim;
            panic!("recorder blew up");
        });
        assert!(handle.await.unwrap_err().is_panic());

        assert!(registry.is_empty());
    }
}
