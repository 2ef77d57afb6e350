//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Snapshot fetch:
//!     → retries.rs (bounded attempts, final vs transient errors)
//!     → backoff.rs (exponential delay between attempts)
//!
//! Live channel reconnect:
//!     → backoff.rs (unbounded attempts, capped delay)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Jittered backoff prevents synchronized retry storms
//! - Jitter never pushes a delay past its cap

pub mod backoff;
pub mod retries;

pub use backoff::{calculate_backoff, Backoff};
pub use retries::{retry, RetryPolicy};
