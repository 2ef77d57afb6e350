//! Snapshot file watcher for offline hot reload.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::model::Snapshot;
use crate::storage::LocalSnapshotStore;

/// Monitors the snapshot file and emits freshly loaded snapshots.
///
/// The parent directory is watched rather than the file itself, so editors
/// that replace the file by rename keep triggering reloads.
pub struct SnapshotWatcher {
    store: LocalSnapshotStore,
    update_tx: mpsc::UnboundedSender<Snapshot>,
}

impl SnapshotWatcher {
    /// Returns the watcher and a receiver for reloaded snapshots.
    pub fn new(store: LocalSnapshotStore) -> (Self, mpsc::UnboundedReceiver<Snapshot>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (Self { store, update_tx }, update_rx)
    }

    /// Starts watching. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx;
        let store = self.store;
        let target = store.path().to_path_buf();
        let watch_dir = watch_dir(&target);

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let relevant = (event.kind.is_modify() || event.kind.is_create())
                        && event.paths.iter().any(|p| same_file_name(p, &target));
                    if !relevant {
                        return;
                    }
                    tracing::info!("Snapshot file change detected, reloading");
                    match store.load() {
                        Ok(snapshot) => {
                            let _ = tx.send(snapshot);
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to reload snapshot file, keeping current configuration");
                        }
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?watch_dir, "Snapshot watcher started");
        Ok(watcher)
    }
}

fn watch_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn same_file_name(candidate: &Path, target: &Path) -> bool {
    candidate.file_name().is_some() && candidate.file_name() == target.file_name()
}
