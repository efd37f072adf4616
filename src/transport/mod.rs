//! Socket abstraction
//!
//! The client never touches a socket directly. A [`Transport`] opens a
//! [`TransportLink`]: a pair of channels carrying frames to and from the
//! underlying connection. Dropping the outbound sender closes the socket;
//! the inbound receiver ending without a close frame counts as an abnormal
//! closure.
//!
//! - [`WsTransport`]: tokio-tungstenite
//! - [`MockTransport`]: in-memory double for tests

use std::future::Future;

use tokio::sync::mpsc;
use url::Url;

use crate::types::RealtimeResult;

pub mod mock;
pub mod websocket;

pub use mock::{MockSocket, MockTransport};
pub use websocket::WsTransport;

/// Frame written by the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// Text payload, sent verbatim
    Text(String),
    /// Close the socket with the given code
    Close(u16),
}

/// Frame delivered to the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// Text payload
    Text(String),
    /// The socket closed; `None` when the close frame carried no code
    Closed(Option<u16>),
}

/// Both halves of an open connection
#[derive(Debug)]
pub struct TransportLink {
    pub outbound: mpsc::UnboundedSender<OutboundFrame>,
    pub inbound: mpsc::UnboundedReceiver<InboundFrame>,
}

impl TransportLink {
    /// Create a link plus the peer ends used by the transport implementation
    pub fn pair() -> (
        Self,
        mpsc::UnboundedReceiver<OutboundFrame>,
        mpsc::UnboundedSender<InboundFrame>,
    ) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        (
            Self {
                outbound: out_tx,
                inbound: in_rx,
            },
            out_rx,
            in_tx,
        )
    }
}

/// Opens connections to a URL.
///
/// The returned future resolves once the socket is open. The client wraps it
/// in the connection timeout; dropping the future must discard any
/// half-open connection.
pub trait Transport: Send + Sync + 'static {
    fn open(&self, url: &Url) -> impl Future<Output = RealtimeResult<TransportLink>> + Send;
}
