//! Connection lifecycle state.
//!
//! The supervisor writes the state into a shared atomic; any number of
//! observers can read it without owning the connection.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
    /// Link dropped, a retry is scheduled
    Reconnecting = 3,
    /// Retry budget exhausted
    Failed = 4,
}

impl ConnectionState {
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Unknown bytes read as `Disconnected`.
    pub fn from_u8(v: u8) -> Self {
        [
            ConnectionState::Disconnected,
            ConnectionState::Connecting,
            ConnectionState::Connected,
            ConnectionState::Reconnecting,
            ConnectionState::Failed,
        ]
        .into_iter()
        .find(|state| state.to_u8() == v)
        .unwrap_or(ConnectionState::Disconnected)
    }

    /// A supervisor is still working on this connection
    pub fn is_active(self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting | ConnectionState::Connected | ConnectionState::Reconnecting
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Read-only view of the supervisor's connection state.
#[derive(Debug, Clone)]
pub struct ConnectionStateObserver {
    state: Arc<AtomicU8>,
}

impl ConnectionStateObserver {
    pub fn new(state: Arc<AtomicU8>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }
}

pub fn set_connection_state(state: &AtomicU8, new_state: ConnectionState) {
    let previous = ConnectionState::from_u8(state.swap(new_state.to_u8(), Ordering::AcqRel));
    if previous != new_state {
        tracing::debug!(from = %previous, to = %new_state, "Connection state changed");
    }
}
