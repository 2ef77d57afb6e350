//! Local persistence.
//!
//! # Responsibilities
//! - Load a snapshot document from disk (offline mode, bootstrap fallback)
//! - Mirror every remotely fetched snapshot back to disk
//! - Watch the file in offline mode and emit reloaded snapshots
//!
//! # Design Decisions
//! - Writes go to a sibling temp file, then rename
//! - A file that fails to parse or validate is rejected whole; the cache keeps
//!   what it had

pub mod snapshot_file;
pub mod watcher;

pub use snapshot_file::LocalSnapshotStore;
pub use watcher::SnapshotWatcher;
