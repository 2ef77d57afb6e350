//! In-memory snapshot cache.
//!
//! # Data Flow
//! ```text
//! sync worker (sole writer)
//!     → Snapshot built off-cache
//!     → ConfigCache::publish (atomic swap of Arc<Snapshot>)
//!     → readers load the current Arc
//! ```
//!
//! # Design Decisions
//! - `arc-swap` gives wait-free reads; no reader ever takes a lock
//! - Lookup misses are `None`, never errors

pub mod config_cache;

pub use config_cache::ConfigCache;
