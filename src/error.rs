//! Error types for the sync engine.
//!
//! Only [`ValidationError`] ever reaches callers of the public surface.
//! Network and storage failures are retried or logged by the background task.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Rejected arguments to `init`, `set_context` or evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("'{0}' must not be empty")]
    EmptyArgument(&'static str),

    #[error("init() must be completed before set_context()")]
    NotInitialized,

    #[error("config_file is required when live updates are disabled")]
    MissingConfigFile,

    #[error("entity id must not be empty")]
    EmptyEntityId,

    #[error("invalid {name}: {reason}")]
    InvalidArgument { name: &'static str, reason: String },
}

/// Bearer token acquisition failed.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("token endpoint returned {status}")]
    Rejected { status: u16 },

    #[error("token response missing access_token")]
    MissingToken,

    #[error("token request timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// A single snapshot retrieval failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("malformed snapshot document: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("invalid snapshot document: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("fetch cancelled")]
    Cancelled,
}

impl FetchError {
    /// Returns true if another attempt may succeed.
    ///
    /// Client errors are final except 429; server errors, timeouts and
    /// transport failures are transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Transport(_) | FetchError::Timeout(_) => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            FetchError::Auth(AuthError::Request(_) | AuthError::Timeout(_)) => true,
            FetchError::Auth(AuthError::Rejected { status }) => *status >= 500,
            FetchError::Auth(AuthError::MissingToken)
            | FetchError::Decode(_)
            | FetchError::Snapshot(_)
            | FetchError::Cancelled => false,
        }
    }
}

/// The live update channel dropped or could not be opened.
///
/// Every variant is transient from the orchestrator's point of view.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("invalid channel request: {0}")]
    Request(String),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("no traffic for {0:?}")]
    IdleTimeout(std::time::Duration),

    #[error("connect timed out after {0:?}")]
    ConnectTimeout(std::time::Duration),

    #[error("connection closed by server")]
    Closed,
}

/// Reading or writing the local snapshot mirror failed.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed snapshot file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid snapshot in {path}: {source}")]
    Snapshot {
        path: PathBuf,
        #[source]
        source: SnapshotError,
    },
}

/// A document could not be turned into a consistent snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("{entity} '{id}': value {value} does not match declared type {expected}")]
    TypeMismatch {
        entity: &'static str,
        id: String,
        expected: &'static str,
        value: String,
    },

    #[error("{entity} '{id}': rollout percentage {value} exceeds 100")]
    RolloutOutOfRange {
        entity: &'static str,
        id: String,
        value: u32,
    },

    #[error("duplicate {entity} id '{id}'")]
    DuplicateId { entity: &'static str, id: String },

    #[error("{entity} id must not be empty")]
    EmptyId { entity: &'static str },
}

/// Crate-level error.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_retry_classification() {
        let server = FetchError::Status { status: 503, message: String::new() };
        let throttled = FetchError::Status { status: 429, message: String::new() };
        let missing = FetchError::Status { status: 404, message: String::new() };
        let unauthorized = FetchError::Status { status: 401, message: String::new() };

        assert!(server.is_retryable());
        assert!(throttled.is_retryable());
        assert!(!missing.is_retryable());
        assert!(!unauthorized.is_retryable());
    }

    #[test]
    fn test_timeout_and_cancel_classification() {
        assert!(FetchError::Timeout(std::time::Duration::from_secs(1)).is_retryable());
        assert!(!FetchError::Cancelled.is_retryable());
        assert!(!FetchError::Snapshot(SnapshotError::EmptyId { entity: "feature" }).is_retryable());
    }
}
