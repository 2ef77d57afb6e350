//! Client-side feature flag and property sync engine.
//!
//! Keeps a local snapshot of remotely managed flags, properties and segments,
//! refreshes it when the service signals a change, and evaluates values per
//! entity without a network round trip.

// Core
pub mod cache;
pub mod evaluation;
pub mod model;
pub mod sync;

// Remote and local sources
pub mod live;
pub mod remote;
pub mod storage;

// Cross-cutting concerns
pub mod config;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::ClientConfig;
pub use error::{Error, Result, ValidationError};
pub use evaluation::EntityAttributes;
pub use events::SubscriptionId;
pub use lifecycle::Shutdown;
pub use model::{ConfigValue, DataType, Feature, Property};
pub use sync::{ContextOptions, SyncOrchestrator, SyncState};
