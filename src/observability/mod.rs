//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape, CLI only)
//! ```
//!
//! # Design Decisions
//! - Transient network failures are visible here and nowhere else
//! - The library never installs a subscriber or exporter on its own

pub mod logging;
pub mod metrics;
