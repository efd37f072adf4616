//! In-memory transport for deterministic tests
//!
//! Every `open` is recorded. Opens are accepted by default; `refuse_next`
//! and `stall_next` queue failures and hangs for the following opens.
//! Accepted connections are handed to the test as [`MockSocket`]s.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use url::Url;

use super::{InboundFrame, OutboundFrame, Transport, TransportLink};
use crate::types::{RealtimeError, RealtimeResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpenBehavior {
    Refuse,
    Stall,
}

#[derive(Default)]
struct MockState {
    opened: Vec<Url>,
    queued: VecDeque<OpenBehavior>,
}

/// Test double for [`Transport`]
#[derive(Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
    accepted_tx: mpsc::UnboundedSender<MockSocket>,
    accepted_rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<MockSocket>>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        let (accepted_tx, accepted_rx) = mpsc::unbounded_channel();
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            accepted_tx,
            accepted_rx: Arc::new(tokio::sync::Mutex::new(accepted_rx)),
        }
    }

    /// Fail the next `n` opens with a transport error
    pub fn refuse_next(&self, n: usize) {
        let mut state = self.state.lock();
        state.queued.extend(std::iter::repeat(OpenBehavior::Refuse).take(n));
    }

    /// Never complete the next `n` opens
    pub fn stall_next(&self, n: usize) {
        let mut state = self.state.lock();
        state.queued.extend(std::iter::repeat(OpenBehavior::Stall).take(n));
    }

    /// Number of open attempts so far
    pub fn open_count(&self) -> usize {
        self.state.lock().opened.len()
    }

    /// URLs of all open attempts, in order
    pub fn opened_urls(&self) -> Vec<Url> {
        self.state.lock().opened.clone()
    }

    /// URL of the most recent open attempt
    pub fn last_url(&self) -> Option<Url> {
        self.state.lock().opened.last().cloned()
    }

    /// Wait for the next accepted connection
    pub async fn accepted(&self) -> Option<MockSocket> {
        self.accepted_rx.lock().await.recv().await
    }

    /// Take an accepted connection if one is waiting
    pub fn try_accepted(&self) -> Option<MockSocket> {
        self.accepted_rx.try_lock().ok()?.try_recv().ok()
    }
}

impl Transport for MockTransport {
    async fn open(&self, url: &Url) -> RealtimeResult<TransportLink> {
        let behavior = {
            let mut state = self.state.lock();
            state.opened.push(url.clone());
            state.queued.pop_front()
        };

        match behavior {
            Some(OpenBehavior::Refuse) => {
                Err(RealtimeError::Transport("connection refused".to_string()))
            }
            Some(OpenBehavior::Stall) => std::future::pending().await,
            None => {
                let (link, outbound, inbound) = TransportLink::pair();
                let _ = self.accepted_tx.send(MockSocket {
                    url: url.clone(),
                    to_client: inbound,
                    from_client: outbound,
                });
                Ok(link)
            }
        }
    }
}

/// Server side of an accepted mock connection
#[derive(Debug)]
pub struct MockSocket {
    pub url: Url,
    to_client: mpsc::UnboundedSender<InboundFrame>,
    from_client: mpsc::UnboundedReceiver<OutboundFrame>,
}

impl MockSocket {
    /// Value of a query parameter on the URL this socket was opened with
    pub fn query(&self, key: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    /// Push a raw text frame to the client
    pub fn push_text(&self, text: impl Into<String>) {
        let _ = self.to_client.send(InboundFrame::Text(text.into()));
    }

    /// Push a serialized value as a text frame
    pub fn push_json<T: Serialize + ?Sized>(&self, value: &T) {
        if let Ok(text) = serde_json::to_string(value) {
            self.push_text(text);
        }
    }

    /// Close the socket with a code
    pub fn close(&self, code: u16) {
        let _ = self.to_client.send(InboundFrame::Closed(Some(code)));
    }

    /// Vanish without a close frame
    pub fn drop_connection(self) {}

    /// Frames the client has written so far
    pub fn sent(&mut self) -> Vec<OutboundFrame> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.from_client.try_recv() {
            frames.push(frame);
        }
        frames
    }

    /// Wait for the next frame written by the client; `None` once the client dropped the link
    pub async fn next_sent(&mut self) -> Option<OutboundFrame> {
        self.from_client.recv().await
    }
}
