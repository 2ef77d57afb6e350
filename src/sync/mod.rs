//! Synchronization lifecycle.
//!
//! # Responsibilities
//! - Validate identity and context, then bootstrap the first snapshot
//! - Run the background task that keeps the cache current
//! - Expose reads, evaluation, subscriptions and shutdown on one handle
//!
//! # Data Flow
//! ```text
//! init → set_context
//!     live_update = false → LocalSnapshotStore::load → OfflineFile
//!     live_update = true  → bootstrap fetch (bounded) → file fallback
//!                         → spawn LiveWorker (channel loop + refresh loop)
//! reads → ConfigCache (never the network)
//! ```
//!
//! # Design Decisions
//! - One context per handle; a second `set_context` stops the first
//! - The background task is the only cache writer after bootstrap
//! - `Stopped` is sticky against late writes from a dying task

pub mod orchestrator;
pub mod state;
pub(crate) mod worker;

pub use orchestrator::{ContextOptions, SyncOrchestrator};
pub use state::SyncState;
