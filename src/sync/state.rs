//! Sync lifecycle state machine.
//!
//! # States
//! - Uninitialized: no identity yet
//! - Ready: `init` done, no context
//! - Bootstrapping: first snapshot being acquired
//! - Connected / Reconnecting: live mode, channel up or being re-established
//! - OfflineFile: serving the local file, no network
//! - Error: bootstrap produced nothing; reads miss
//! - Stopped: shut down
//!
//! # State Transitions
//! ```text
//! Uninitialized → Ready                      init
//! Ready → Bootstrapping                      set_context
//! Bootstrapping → OfflineFile                live_update = false
//! Bootstrapping → Reconnecting               snapshot acquired, channel not yet open
//! Bootstrapping → Error                      no remote, no usable file
//! Reconnecting → Connected                   channel open
//! Connected → Reconnecting                   disconnect / idle timeout
//! Error → Connected                          channel open and refetch succeeded
//! any → Stopped                              shutdown
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SyncState {
    Uninitialized = 0,
    Ready = 1,
    Bootstrapping = 2,
    Connected = 3,
    Reconnecting = 4,
    OfflineFile = 5,
    Error = 6,
    Stopped = 7,
}

impl SyncState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => SyncState::Ready,
            2 => SyncState::Bootstrapping,
            3 => SyncState::Connected,
            4 => SyncState::Reconnecting,
            5 => SyncState::OfflineFile,
            6 => SyncState::Error,
            7 => SyncState::Stopped,
            _ => SyncState::Uninitialized,
        }
    }

    /// Live mode, whether or not the channel is currently up.
    pub fn is_live(self) -> bool {
        matches!(self, SyncState::Connected | SyncState::Reconnecting)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SyncState::Uninitialized => "uninitialized",
            SyncState::Ready => "ready",
            SyncState::Bootstrapping => "bootstrapping",
            SyncState::Connected => "connected",
            SyncState::Reconnecting => "reconnecting",
            SyncState::OfflineFile => "offline_file",
            SyncState::Error => "error",
            SyncState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lock-free cell shared between the handle and the background task.
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    pub fn new(state: SyncState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub fn get(&self) -> SyncState {
        SyncState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Stores `next` and logs the transition if the state changed.
    pub fn set(&self, next: SyncState) {
        let prev = SyncState::from_u8(self.0.swap(next as u8, Ordering::AcqRel));
        if prev != next {
            tracing::info!(from = %prev, to = %next, "Sync state changed");
        }
    }

    /// Moves to `next` unless the cell is already `Stopped`.
    ///
    /// Keeps a late write from the background task from resurrecting a
    /// shut-down handle.
    pub fn advance(&self, next: SyncState) -> bool {
        let mut current = self.0.load(Ordering::Acquire);
        loop {
            if current == SyncState::Stopped as u8 {
                return false;
            }
            match self
                .0
                .compare_exchange(current, next as u8, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => {
                    let prev = SyncState::from_u8(current);
                    if prev != next {
                        tracing::info!(from = %prev, to = %next, "Sync state changed");
                    }
                    return true;
                }
                Err(actual) => current = actual,
            }
        }
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new(SyncState::Uninitialized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repr_round_trip() {
        for state in [
            SyncState::Uninitialized,
            SyncState::Ready,
            SyncState::Bootstrapping,
            SyncState::Connected,
            SyncState::Reconnecting,
            SyncState::OfflineFile,
            SyncState::Error,
            SyncState::Stopped,
        ] {
            assert_eq!(SyncState::from_u8(state as u8), state);
        }
    }

    #[test]
    fn test_stopped_is_terminal_for_advance() {
        let cell = StateCell::new(SyncState::Connected);
        assert!(cell.advance(SyncState::Reconnecting));
        assert_eq!(cell.get(), SyncState::Reconnecting);

        cell.set(SyncState::Stopped);
        assert!(!cell.advance(SyncState::Connected));
        assert_eq!(cell.get(), SyncState::Stopped);
    }

    #[test]
    fn test_is_live() {
        assert!(SyncState::Connected.is_live());
        assert!(SyncState::Reconnecting.is_live());
        assert!(!SyncState::OfflineFile.is_live());
    }
}
