//! Error type for the realtime client

use thiserror::Error;

/// Result alias used throughout the crate
pub type RealtimeResult<T> = Result<T, RealtimeError>;

/// Errors produced while building endpoints, parsing frames or opening sockets.
///
/// Only `Disabled`, `InvalidUrl` and `MissingChannelId` ever reach callers of
/// [`crate::RealtimeClient`]; everything else is absorbed by the reconnect loop.
#[derive(Error, Debug)]
pub enum RealtimeError {
    #[error("WebSocket transport is disabled")]
    Disabled,

    #[error("Invalid WebSocket URL: {0}")]
    InvalidUrl(String),

    #[error("Channel `{0}` requires a numeric id")]
    MissingChannelId(String),

    #[error("Unknown channel `{0}`")]
    UnknownChannel(String),

    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Connection not established within {0:?}")]
    Timeout(std::time::Duration),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<url::ParseError> for RealtimeError {
    fn from(err: url::ParseError) -> Self {
        RealtimeError::InvalidUrl(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for RealtimeError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        RealtimeError::Transport(err.to_string())
    }
}
