//! Vehicle Connection State Machine
//!
//! Defines the valid transitions of the vehicle link. `Ready` is terminal:
//! once the connection is confirmed it is never un-confirmed for the life of
//! the process.

use thiserror::Error;

/// Lifecycle of the vehicle connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No connection attempt in progress
    #[default]
    Disconnected,
    /// Handshake with the driver in progress
    Connecting,
    /// Connection confirmed, commands may be issued
    Ready,
}

/// Events that can trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A connection attempt was started
    ConnectStarted,
    /// The driver confirmed the connection
    Established,
    /// The connection attempt failed
    ConnectFailed,
}

/// Rejected transition
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid transition from {from:?} on {event:?}")]
pub struct TransitionError {
    pub from: ConnectionState,
    pub event: ConnectionEvent,
}

impl ConnectionState {
    /// Whether hardware operations may be issued
    pub fn is_ready(&self) -> bool {
        matches!(self, ConnectionState::Ready)
    }

    /// Get the next state for a given event, if the transition is valid
    pub fn next(self, event: ConnectionEvent) -> Result<ConnectionState, TransitionError> {
        use ConnectionEvent::*;
        use ConnectionState::*;

        match (self, event) {
            (Disconnected, ConnectStarted) => Ok(Connecting),
            (Connecting, Established) => Ok(Ready),
            (Connecting, ConnectFailed) => Ok(Disconnected),

            // Invalid transition
            (from, event) => Err(TransitionError { from, event }),
        }
    }
}
