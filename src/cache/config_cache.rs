//! Lock-free snapshot cache.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::model::{Feature, Property, Snapshot};
use crate::observability::metrics;

/// Holds exactly one current [`Snapshot`] and swaps it atomically.
///
/// Readers take a reference to whichever snapshot is current when they call;
/// they never block and never see a half-applied refresh.
#[derive(Debug)]
pub struct ConfigCache {
    current: ArcSwap<Snapshot>,
    /// Number of snapshots published so far.
    version: AtomicU64,
}

impl ConfigCache {
    /// Creates a cache holding an empty snapshot.
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot::empty()),
            version: AtomicU64::new(0),
        }
    }

    /// Replaces the current snapshot in a single reference swap.
    ///
    /// Returns the snapshot that was superseded.
    pub fn publish(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let features = snapshot.features().len();
        let properties = snapshot.properties().len();

        let previous = self.current.swap(Arc::new(snapshot));
        let version = self.version.fetch_add(1, Ordering::AcqRel) + 1;

        metrics::record_snapshot_size(features, properties);
        tracing::debug!(version, features, properties, "Snapshot published");
        previous
    }

    /// Drops the current snapshot and returns to the unpopulated state.
    ///
    /// Used when the handle switches to a different collection/environment, so
    /// reads never mix contexts.
    pub fn reset(&self) {
        self.current.store(Arc::new(Snapshot::empty()));
        self.version.store(0, Ordering::Release);
        metrics::record_snapshot_size(0, 0);
    }

    /// The current snapshot, for callers that need several reads from one version.
    pub fn load(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    pub fn get_feature(&self, id: &str) -> Option<Arc<Feature>> {
        self.current.load().feature(id).cloned()
    }

    pub fn get_features(&self) -> HashMap<String, Arc<Feature>> {
        self.current.load().features().clone()
    }

    pub fn get_property(&self, id: &str) -> Option<Arc<Property>> {
        self.current.load().property(id).cloned()
    }

    pub fn get_properties(&self) -> HashMap<String, Arc<Property>> {
        self.current.load().properties().clone()
    }

    /// Returns true once any snapshot has been published.
    pub fn is_populated(&self) -> bool {
        self.version() > 0
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }
}

impl Default for ConfigCache {
    fn default() -> Self {
        Self::new()
    }
}
