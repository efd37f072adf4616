//! Observable connection status

use serde::{Deserialize, Serialize};

/// Lifecycle of a [`crate::RealtimeClient`] connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No socket and no retry pending (initial, after `disconnect`, or after a normal close)
    #[default]
    Idle,
    /// An open attempt is in flight
    Connecting,
    /// The socket is live
    Open,
    /// The socket dropped and a retry is scheduled
    Retrying,
    /// The retry cap was reached; no further automatic attempts
    Failed,
}

impl ConnectionState {
    /// True while live updates are flowing
    pub fn is_live(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Idle => write!(f, "idle"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Open => write!(f, "open"),
            ConnectionState::Retrying => write!(f, "retrying"),
            ConnectionState::Failed => write!(f, "failed"),
        }
    }
}
