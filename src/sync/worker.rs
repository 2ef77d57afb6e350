//! Background sync task.
//!
//! # Responsibilities
//! - Keep the live channel open, reconnecting with capped backoff forever
//! - Turn change signals into full refetches, at most one in flight
//! - Publish, mirror to disk and notify on every successful refresh
//! - In offline mode, republish the snapshot file when it changes
//!
//! # Data Flow
//! ```text
//! channel_loop ──signal──▶ Notify (one permit) ──▶ refresh_loop
//!                                                   → fetch → publish → save → notify
//! ```
//!
//! # Design Decisions
//! - The two loops run under one `tokio::join!`, so one task owns all writes
//! - A refresh already in flight absorbs any number of signals into one
//!   follow-up pass
//! - Every connect that follows a failed attempt or a lost channel refetches

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Notify};

use crate::cache::ConfigCache;
use crate::error::FetchError;
use crate::events::ChangeNotifier;
use crate::lifecycle::Shutdown;
use crate::live::LiveUpdateChannel;
use crate::model::Snapshot;
use crate::observability::metrics;
use crate::remote::RemoteConfigFetcher;
use crate::resilience::backoff::Backoff;
use crate::storage::LocalSnapshotStore;
use crate::sync::state::{StateCell, SyncState};

/// State shared by the handle and the background task.
#[derive(Debug, Default)]
pub(crate) struct Shared {
    pub cache: ConfigCache,
    pub notifier: ChangeNotifier,
    pub state: StateCell,
}

impl Shared {
    /// Swaps in a new snapshot, mirrors it if a store is given, then notifies.
    pub fn apply(&self, snapshot: Snapshot, mirror: Option<&LocalSnapshotStore>) {
        self.cache.publish(snapshot);

        if let Some(store) = mirror {
            let current = self.cache.load();
            if let Err(e) = store.save(&current) {
                tracing::warn!(error = %e, "Failed to mirror snapshot to file");
            }
        }

        let delivered = self.notifier.publish();
        tracing::debug!(subscribers = delivered, "Configuration update delivered");
    }
}

/// Owns the live channel and the refresh loop for one context.
pub(crate) struct LiveWorker {
    pub shared: Arc<Shared>,
    pub fetcher: RemoteConfigFetcher,
    pub channel: LiveUpdateChannel,
    pub store: Option<LocalSnapshotStore>,
    pub reconnect: Backoff,
    pub shutdown: Shutdown,
}

impl LiveWorker {
    /// Runs until shutdown.
    ///
    /// `resync_on_first_connect` is set when bootstrap could not fetch from the
    /// remote, so the first open channel triggers a full fetch. A failed
    /// connect attempt has the same effect.
    pub async fn run(self, resync_on_first_connect: bool) {
        let refresh = Notify::new();
        let connected = AtomicBool::new(false);

        tokio::join!(
            self.channel_loop(&refresh, &connected, resync_on_first_connect),
            self.refresh_loop(&refresh, &connected),
        );

        metrics::record_channel_connected(false);
        tracing::info!("Sync worker stopped");
    }

    async fn channel_loop(&self, refresh: &Notify, connected: &AtomicBool, mut resync: bool) {
        let mut attempt: u32 = 0;

        loop {
            let connect = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return,
                result = self.channel.connect() => result,
            };

            match connect {
                Ok(mut connection) => {
                    attempt = 0;
                    connected.store(true, Ordering::Release);
                    metrics::record_channel_connected(true);
                    if self.shared.state.get() != SyncState::Error {
                        self.shared.state.advance(SyncState::Connected);
                    }

                    if resync {
                        refresh.notify_one();
                    }
                    resync = true;

                    loop {
                        let next = tokio::select! {
                            biased;
                            _ = self.shutdown.cancelled() => None,
                            next = connection.next_change() => Some(next),
                        };

                        match next {
                            None => {
                                connection.close().await;
                                return;
                            }
                            Some(Ok(())) => {
                                metrics::record_change_signal();
                                refresh.notify_one();
                            }
                            Some(Err(e)) => {
                                tracing::warn!(connection_id = %connection.id(), error = %e, "Live update channel lost");
                                break;
                            }
                        }
                    }

                    connected.store(false, Ordering::Release);
                    metrics::record_channel_connected(false);
                    if self.shared.state.get() != SyncState::Error {
                        self.shared.state.advance(SyncState::Reconnecting);
                    }
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "Live update channel connect failed");
                    resync = true;
                }
            }

            attempt = attempt.saturating_add(1);
            metrics::record_reconnect();
            let delay = self.reconnect.delay(attempt);
            tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "Reconnecting after backoff");

            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn refresh_loop(&self, refresh: &Notify, connected: &AtomicBool) {
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return,
                _ = refresh.notified() => {}
            }
            self.refresh(connected).await;
        }
    }

    async fn refresh(&self, connected: &AtomicBool) {
        match self.fetcher.fetch(&self.shutdown).await {
            Ok(snapshot) => {
                self.shared.apply(snapshot, self.store.as_ref());
                metrics::record_refresh("success");

                if self.shared.state.get() == SyncState::Error {
                    let next = if connected.load(Ordering::Acquire) {
                        SyncState::Connected
                    } else {
                        SyncState::Reconnecting
                    };
                    self.shared.state.advance(next);
                }
            }
            Err(FetchError::Cancelled) => {}
            Err(e) => {
                metrics::record_refresh("failure");
                tracing::error!(error = %e, "Refresh failed, keeping last known good snapshot");
            }
        }
    }
}

/// Republishes the snapshot file whenever the watcher reloads it.
///
/// Unchanged documents are skipped, since one save can raise several
/// filesystem events.
pub(crate) async fn run_file_watch(
    shared: Arc<Shared>,
    mut updates: mpsc::UnboundedReceiver<Snapshot>,
    shutdown: Shutdown,
) {
    loop {
        let snapshot = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            next = updates.recv() => match next {
                Some(snapshot) => snapshot,
                None => break,
            },
        };

        if snapshot.document() == shared.cache.load().document() {
            tracing::debug!("Snapshot file unchanged, skipping publish");
            continue;
        }

        shared.apply(snapshot, None);
        metrics::record_refresh("file");
    }
    tracing::info!("Snapshot file watch stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SnapshotDocument;
    use std::sync::atomic::AtomicUsize;

    fn snapshot(json: &str) -> Snapshot {
        let doc: SnapshotDocument = serde_json::from_str(json).unwrap();
        Snapshot::from_document(doc).unwrap()
    }

    #[test]
    fn test_apply_publishes_mirrors_and_notifies() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalSnapshotStore::new(dir.path().join("mirror.json"));
        let shared = Shared::default();
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        shared.notifier.subscribe(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        shared.apply(
            snapshot(r#"{"properties":[{"property_id":"p","type":"STRING","value":"v"}]}"#),
            Some(&store),
        );

        assert!(shared.cache.get_property("p").is_some());
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(store.load().unwrap().property("p").is_some());
    }

    #[tokio::test]
    async fn test_file_watch_skips_identical_documents() {
        let shared = Arc::new(Shared::default());
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        shared.notifier.subscribe(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        let (tx, rx) = mpsc::unbounded_channel();
        let shutdown = Shutdown::new();
        let task = tokio::spawn(run_file_watch(Arc::clone(&shared), rx, shutdown.clone()));

        let doc = r#"{"features":[{"feature_id":"f","type":"BOOLEAN","enabled":true,"enabled_value":true,"disabled_value":false}]}"#;
        tx.send(snapshot(doc)).unwrap();
        tx.send(snapshot(doc)).unwrap();
        drop(tx);
        task.await.unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(shared.cache.get_feature("f").is_some());
    }
}
