//! Remote service access.
//!
//! # Responsibilities
//! - Build REST and WebSocket URLs for an instance/collection/environment
//! - Acquire bearer tokens behind the [`Authenticator`] trait
//! - Fetch one complete, validated snapshot per call with bounded retry
//!
//! # Data Flow
//! ```text
//! fetch(shutdown)
//!     → Authenticator::token()
//!     → GET {api_base}/apprapp/feature/v1/instances/{guid}/config
//!     → SnapshotDocument → Snapshot::from_document
//! ```
//!
//! # Design Decisions
//! - A token is requested per attempt; the trait implementation may cache
//! - 4xx is final except 429

pub mod auth;
pub mod endpoints;
pub mod fetcher;

pub use auth::{Authenticator, IamAuthenticator, StaticTokenAuthenticator, DEFAULT_IAM_URL};
pub use endpoints::{ContextKey, Endpoints};
pub use fetcher::RemoteConfigFetcher;
