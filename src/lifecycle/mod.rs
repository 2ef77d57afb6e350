//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     trigger() → every select on cancelled() wakes → background task exits
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → CLI `watch` stops and shuts the client down
//! ```
//!
//! # Design Decisions
//! - One token per context; `set_context` replaces it with a fresh child
//! - Shutdown has a grace period, then the task is aborted

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
