//! Live update channel.
//!
//! # Data Flow
//! ```text
//! connect() → fresh token → wss://.../apprapp/wsfeature (Authorization: Bearer)
//! next_change():
//!     Ping / Pong / "test message" → reset idle timer, keep reading
//!     other text or binary         → Ok(())  (caller refetches)
//!     Close / end of stream        → Err(Closed)
//!     idle timeout                 → Err(IdleTimeout)
//! ```
//!
//! # Design Decisions
//! - Frames carry no payload the client uses; every change means a full refetch
//! - Every error is transient; the caller reconnects with backoff

pub mod channel;

pub use channel::{classify, FrameKind, LiveConnection, LiveUpdateChannel, KEEPALIVE_MARKER};
