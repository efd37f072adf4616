//! Reconnecting event stream client
//!
//! One [`RealtimeClient`] owns at most one live link to one channel endpoint.
//! Inbound frames are parsed into [`Event`]s and dispatched to handlers
//! registered per event type. Unexpected drops (any close code other than
//! 1000) are retried with capped exponential backoff, and every retry carries
//! the last seen event id as `since_event_id` so the server can replay what
//! was missed. Delivery across a reconnect is therefore at-least-once.
//!
//! Connectivity problems never surface as errors: `connect` always resolves
//! and the observable [`ConnectionState`] reports what happened.
//!
//! ```text
//! Idle -> Connecting -> Open -> (close != 1000) -> Retrying -> Connecting ...
//!                         |                          |
//!                   close == 1000              cap reached -> Failed
//!                         v
//!                        Idle   <- disconnect() from any state
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};
use url::Url;

use crate::channel::{websocket_url, with_resume_cursor, Channel};
use crate::config::{RealtimeConfig, ReconnectPolicy};
use crate::transport::{InboundFrame, OutboundFrame, Transport, WsTransport};
use crate::types::{
    ConnectionState, Event, RealtimeError, RealtimeResult, ABNORMAL_CLOSURE, NORMAL_CLOSURE,
};

mod handlers;

pub use handlers::{handler, EventHandler, HandlerRegistry};

/// Mutable connection fields, only touched under the lock and never across an await
struct Inner {
    /// Outbound half of the live link, if any
    link: Option<mpsc::UnboundedSender<OutboundFrame>>,
    /// An open attempt is in flight
    connecting: bool,
    /// Retries scheduled since the last successful open
    attempts: u32,
    /// Resume cursor
    last_event_id: Option<String>,
    /// Cleared only by `disconnect`
    should_reconnect: bool,
    /// Bumped whenever the live link is replaced or torn down
    generation: u64,
    /// Pending backoff timer
    retry: Option<JoinHandle<()>>,
}

impl Inner {
    /// Move the resume cursor forward.
    ///
    /// Ids that both parse as integers are compared numerically and an older
    /// id never replaces a newer one. Anything else advances unconditionally.
    fn advance_cursor(&mut self, id: &str) {
        if let Some(current) = self.last_event_id.as_deref() {
            if let (Ok(current), Ok(next)) = (current.parse::<u64>(), id.parse::<u64>()) {
                if next < current {
                    debug!(current, next, "Ignoring out-of-order event id");
                    return;
                }
            }
        }
        self.last_event_id = Some(id.to_string());
    }
}

struct Shared<T> {
    transport: T,
    url: Url,
    policy: ReconnectPolicy,
    inner: Mutex<Inner>,
    handlers: HandlerRegistry,
    state_tx: watch::Sender<ConnectionState>,
}

/// Best-effort live connection to one channel
pub struct RealtimeClient<T: Transport = WsTransport> {
    shared: Arc<Shared<T>>,
}

impl RealtimeClient<WsTransport> {
    /// Build a client for a channel over WebSocket.
    ///
    /// Fails only when the endpoint cannot be built (transport disabled or
    /// malformed base URL). No connection is attempted until [`Self::connect`].
    pub fn new(config: &RealtimeConfig, channel: Channel, token: &str) -> RealtimeResult<Self> {
        Self::with_transport(config, channel, token, WsTransport::new())
    }
}

impl<T: Transport> RealtimeClient<T> {
    /// Build a client for a channel over a custom transport
    pub fn with_transport(
        config: &RealtimeConfig,
        channel: Channel,
        token: &str,
        transport: T,
    ) -> RealtimeResult<Self> {
        let url = websocket_url(config, channel, token)?;
        Ok(Self::from_url(url, config.policy.clone(), transport))
    }

    /// Build a client for an already constructed endpoint URL
    pub fn from_url(url: Url, policy: ReconnectPolicy, transport: T) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Idle);
        Self {
            shared: Arc::new(Shared {
                transport,
                url,
                policy,
                inner: Mutex::new(Inner {
                    link: None,
                    connecting: false,
                    attempts: 0,
                    last_event_id: None,
                    should_reconnect: true,
                    generation: 0,
                    retry: None,
                }),
                handlers: HandlerRegistry::new(),
                state_tx,
            }),
        }
    }

    /// Open the connection, or do nothing if it is open or opening.
    ///
    /// The resume cursor is the more recent of `resume_from` and the last
    /// event id this client has seen. The returned future resolves once the
    /// socket opened, failed, or hit the connection timeout; it never fails,
    /// so a resolved `connect` is not proof of connectivity. Failures hand
    /// over to the backoff loop.
    pub async fn connect(&self, resume_from: Option<&str>) {
        let cursor = {
            let mut inner = self.shared.inner.lock();
            if inner.link.is_some() {
                return;
            }
            if inner.connecting {
                // Adopt the in-flight attempt, even one started before a disconnect()
                if !inner.should_reconnect {
                    inner.should_reconnect = true;
                    self.shared.state_tx.send_replace(ConnectionState::Connecting);
                }
                return;
            }
            if let Some(id) = resume_from {
                inner.advance_cursor(id);
            }
            inner.should_reconnect = true;
            // An explicit connect supersedes a pending backoff timer
            if let Some(retry) = inner.retry.take() {
                retry.abort();
            }
            if *self.shared.state_tx.borrow() == ConnectionState::Failed {
                inner.attempts = 0;
            }
            inner.connecting = true;
            self.shared.state_tx.send_replace(ConnectionState::Connecting);
            inner.last_event_id.clone()
        };

        // The attempt owns `connecting`, so it must finish even if this future is dropped
        let shared = Arc::clone(&self.shared);
        let attempt = tokio::spawn(async move { shared.open(cursor).await });
        let _ = attempt.await;
    }

    /// Register a handler for an event type. Registrations are additive and
    /// run in insertion order.
    pub fn on(&self, event_type: impl Into<String>, handler: EventHandler) {
        self.shared.handlers.add(event_type, handler);
    }

    /// Remove the first registration of `handler` for `event_type`; no-op when absent
    pub fn off(&self, event_type: &str, handler: &EventHandler) -> bool {
        self.shared.handlers.remove(event_type, handler)
    }

    /// Number of handlers registered for an event type
    pub fn handler_count(&self, event_type: &str) -> usize {
        self.shared.handlers.count(event_type)
    }

    /// Write `payload` as one JSON text frame if the socket is open.
    ///
    /// Otherwise the payload is dropped with a warning; nothing is queued.
    /// Returns whether the frame was handed to the socket.
    pub fn send<P: Serialize + ?Sized>(&self, payload: &P) -> bool {
        let inner = self.shared.inner.lock();
        let Some(link) = inner.link.as_ref() else {
            warn!("Realtime socket not open, dropping outbound message");
            return false;
        };

        let text = match serde_json::to_string(payload) {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Failed to serialize outbound realtime message");
                return false;
            }
        };

        if link.send(OutboundFrame::Text(text)).is_err() {
            warn!("Realtime socket closed while sending, dropping outbound message");
            return false;
        }
        true
    }

    /// Close the connection and stop all automatic reconnection
    pub fn disconnect(&self) {
        self.shared.disconnect();
    }

    /// Last observed event id (`getLastEventId`)
    pub fn last_event_id(&self) -> Option<String> {
        self.shared.inner.lock().last_event_id.clone()
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        *self.shared.state_tx.borrow()
    }

    /// Watch receiver for state changes
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    /// Stream of state changes, starting with the current state
    pub fn state_stream(&self) -> WatchStream<ConnectionState> {
        WatchStream::new(self.watch_state())
    }

    /// Retries scheduled since the last successful open
    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.inner.lock().attempts
    }

    /// Endpoint URL without the resume cursor
    pub fn url(&self) -> &Url {
        &self.shared.url
    }
}

impl<T: Transport> Drop for RealtimeClient<T> {
    fn drop(&mut self) {
        self.shared.disconnect();
    }
}

impl<T: Transport> Shared<T> {
    /// Run one open attempt. The caller has already set `connecting` and the
    /// `Connecting` state.
    async fn open(self: &Arc<Self>, cursor: Option<String>) {
        let url = with_resume_cursor(&self.url, cursor.as_deref());
        debug!(path = url.path(), cursor = ?cursor, "Opening realtime connection");

        let timeout = self.policy.connect_timeout;
        let result = match tokio::time::timeout(timeout, self.transport.open(&url)).await {
            Ok(result) => result,
            // Dropping the open future discards the half-open socket
            Err(_) => Err(RealtimeError::Timeout(timeout)),
        };
        let link = match result {
            Ok(link) => link,
            Err(e) => {
                warn!(path = url.path(), error = %e, "Realtime connection failed");
                self.open_failed();
                return;
            }
        };

        let generation = {
            let mut inner = self.inner.lock();
            inner.connecting = false;
            if !inner.should_reconnect {
                // disconnect() won the race against this attempt
                let _ = link.outbound.send(OutboundFrame::Close(NORMAL_CLOSURE));
                return;
            }
            inner.generation += 1;
            inner.link = Some(link.outbound);
            inner.attempts = 0;
            self.state_tx.send_replace(ConnectionState::Open);
            inner.generation
        };
        info!(path = url.path(), "Realtime connection open");

        let shared = Arc::clone(self);
        tokio::spawn(async move {
            shared.drive(generation, link.inbound).await;
        });
    }

    fn open_failed(self: &Arc<Self>) {
        self.inner.lock().connecting = false;
        self.schedule_reconnect();
    }

    /// Read frames from one link until it closes
    async fn drive(self: Arc<Self>, generation: u64, mut inbound: mpsc::UnboundedReceiver<InboundFrame>) {
        let code = loop {
            match inbound.recv().await {
                Some(InboundFrame::Text(text)) => {
                    if !self.handle_message(generation, &text) {
                        return;
                    }
                }
                Some(InboundFrame::Closed(code)) => break code,
                None => break Some(ABNORMAL_CLOSURE),
            }
        };
        self.handle_close(generation, code);
    }

    /// Parse and dispatch one frame. Returns false once the link is stale.
    fn handle_message(&self, generation: u64, text: &str) -> bool {
        let event = match Event::parse(text) {
            Ok(event) => Some(event),
            Err(e) => {
                if cfg!(debug_assertions) {
                    debug!(error = %e, "Dropping malformed realtime message");
                }
                None
            }
        };

        {
            let mut inner = self.inner.lock();
            if inner.generation != generation || inner.link.is_none() {
                return false;
            }
            if let Some(id) = event.as_ref().and_then(|e| e.event_id.as_deref()) {
                inner.advance_cursor(id);
            }
        }

        if let Some(event) = event {
            self.handlers.dispatch(&event);
        }
        true
    }

    fn handle_close(self: &Arc<Self>, generation: u64, code: Option<u16>) {
        {
            let mut inner = self.inner.lock();
            if inner.generation != generation || inner.link.is_none() {
                return;
            }
            inner.link = None;
            if code == Some(NORMAL_CLOSURE) {
                self.state_tx.send_replace(ConnectionState::Idle);
                info!("Realtime connection closed normally");
                return;
            }
        }

        warn!(code = ?code, "Realtime connection dropped");
        self.schedule_reconnect();
    }

    /// Arm the backoff timer for the next retry, or give up
    fn schedule_reconnect(self: &Arc<Self>) {
        let mut inner = self.inner.lock();
        if !inner.should_reconnect {
            self.state_tx.send_replace(ConnectionState::Idle);
            return;
        }
        if inner.attempts >= self.policy.max_attempts {
            self.state_tx.send_replace(ConnectionState::Failed);
            warn!(
                attempts = inner.attempts,
                "Realtime reconnection attempts exhausted, live updates unavailable"
            );
            return;
        }

        let delay = self.policy.delay_for(inner.attempts);
        inner.attempts += 1;
        let attempt = inner.attempts;

        let shared = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            shared.retry().await;
        });
        if let Some(stale) = inner.retry.replace(handle) {
            stale.abort();
        }
        self.state_tx.send_replace(ConnectionState::Retrying);

        info!(
            attempt,
            max_attempts = self.policy.max_attempts,
            delay_ms = delay.as_millis() as u64,
            "Scheduling realtime reconnect"
        );
    }

    /// Backoff timer fired
    async fn retry(self: Arc<Self>) {
        let cursor = {
            let mut inner = self.inner.lock();
            inner.retry = None;
            if !inner.should_reconnect || inner.link.is_some() || inner.connecting {
                return;
            }
            inner.connecting = true;
            self.state_tx.send_replace(ConnectionState::Connecting);
            inner.last_event_id.clone()
        };

        self.open(cursor).await;
    }

    fn disconnect(&self) {
        let mut inner = self.inner.lock();
        inner.should_reconnect = false;
        if let Some(retry) = inner.retry.take() {
            retry.abort();
        }
        inner.generation += 1;
        if let Some(link) = inner.link.take() {
            let _ = link.send(OutboundFrame::Close(NORMAL_CLOSURE));
        }
        self.state_tx.send_replace(ConnectionState::Idle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn client(transport: &MockTransport) -> RealtimeClient<MockTransport> {
        let config = RealtimeConfig::new("ws://rt.test/ws");
        RealtimeClient::with_transport(&config, Channel::Orders(9), "secret", transport.clone())
            .unwrap()
    }

    /// Let spawned tasks run without advancing the paused clock past any timer
    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_opens_once() {
        let transport = MockTransport::new();
        let client = client(&transport);

        client.connect(None).await;
        client.connect(None).await;

        assert_eq!(transport.open_count(), 1);
        assert_eq!(client.state(), ConnectionState::Open);
        let url = transport.last_url().unwrap();
        assert_eq!(url.as_str(), "ws://rt.test/ws/orders/9?token=secret");
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_while_opening_is_noop() {
        let transport = MockTransport::new();
        transport.stall_next(1);
        let client = Arc::new(client(&transport));

        let first = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.connect(None).await })
        };
        settle().await;
        assert_eq!(client.state(), ConnectionState::Connecting);

        // Returns before the stalled attempt reaches its 5s timeout
        let second = tokio::time::timeout(Duration::from_millis(10), client.connect(None)).await;
        assert!(second.is_ok());
        assert_eq!(transport.open_count(), 1);
        assert_eq!(client.state(), ConnectionState::Connecting);

        first.await.unwrap();
        assert_eq!(transport.open_count(), 1);
        assert_eq!(client.state(), ConnectionState::Retrying);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_connect_still_recovers() {
        let transport = MockTransport::new();
        transport.stall_next(1);
        let client = client(&transport);

        let cancelled = tokio::time::timeout(Duration::from_secs(1), client.connect(None)).await;
        assert!(cancelled.is_err());

        client.connect(None).await;
        tokio::time::sleep(Duration::from_secs(120)).await;
        let _socket = transport.accepted().await.unwrap();
        settle().await;

        assert_eq!(transport.open_count(), 2);
        assert_eq!(client.state(), ConnectionState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_after_disconnect_adopts_inflight_attempt() {
        let transport = MockTransport::new();
        transport.stall_next(1);
        let client = Arc::new(client(&transport));

        let pending = {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.connect(None).await })
        };
        settle().await;

        client.disconnect();
        assert_eq!(client.state(), ConnectionState::Idle);
        client.connect(None).await;
        assert_eq!(client.state(), ConnectionState::Connecting);

        // The stalled attempt times out and hands over to the backoff loop
        tokio::time::sleep(Duration::from_secs(120)).await;
        pending.await.unwrap();
        let _socket = transport.accepted().await.unwrap();
        settle().await;

        assert_eq!(transport.open_count(), 2);
        assert_eq!(client.state(), ConnectionState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_frames_after_disconnect_are_ignored() {
        let transport = MockTransport::new();
        let client = client(&transport);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        client.on(
            "order.updated",
            handler(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        client.connect(None).await;
        let socket = transport.accepted().await.unwrap();
        socket.push_text(r#"{"type":"order.updated","data":{},"event_id":"3"}"#);
        settle().await;

        client.disconnect();
        socket.push_text(r#"{"type":"order.updated","data":{},"event_id":"4"}"#);
        settle().await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(client.last_event_id().as_deref(), Some("3"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_event_advances_cursor_and_dispatches() {
        let transport = MockTransport::new();
        let client = client(&transport);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        client.on(
            "order.updated",
            handler(move |event| {
                assert_eq!(event.data["status"], "ready");
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        client.connect(None).await;
        let socket = transport.accepted().await.unwrap();
        socket.push_json(&json!({
            "type": "order.updated",
            "data": {"status": "ready"},
            "event_id": "42",
            "timestamp": "2024-05-01T12:00:00Z",
            "version": "1"
        }));
        settle().await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(client.last_event_id().as_deref(), Some("42"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_messages_are_dropped() {
        let transport = MockTransport::new();
        let client = client(&transport);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        client.on(
            "order.updated",
            handler(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        client.connect(None).await;
        let socket = transport.accepted().await.unwrap();
        socket.push_text("{not json");
        socket.push_text(r#"{"type":"order.updated","event_id":"5"}"#);
        socket.push_text(r#"{"data":{},"event_id":"6"}"#);
        settle().await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(client.last_event_id(), None);
        assert_eq!(client.state(), ConnectionState::Open);

        socket.push_text(r#"{"type":"order.updated","data":{},"event_id":"7"}"#);
        settle().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cursor_never_moves_backwards() {
        let transport = MockTransport::new();
        let client = client(&transport);

        client.connect(None).await;
        let socket = transport.accepted().await.unwrap();
        socket.push_text(r#"{"type":"a","data":null,"event_id":"10"}"#);
        socket.push_text(r#"{"type":"a","data":null,"event_id":"9"}"#);
        settle().await;
        assert_eq!(client.last_event_id().as_deref(), Some("10"));

        socket.push_text(r#"{"type":"a","data":null,"event_id":"11"}"#);
        settle().await;
        assert_eq!(client.last_event_id().as_deref(), Some("11"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_cursor_prefers_newer_id() {
        let transport = MockTransport::new();
        let client = client(&transport);

        client.connect(Some("17")).await;
        let mut socket = transport.accepted().await.unwrap();
        assert_eq!(socket.query("since_event_id").as_deref(), Some("17"));
        assert_eq!(client.last_event_id().as_deref(), Some("17"));

        socket.push_text(r#"{"type":"a","data":null,"event_id":"20"}"#);
        settle().await;
        client.disconnect();
        assert_eq!(socket.next_sent().await, Some(OutboundFrame::Close(NORMAL_CLOSURE)));

        // Caller-supplied id older than what was seen loses
        client.connect(Some("18")).await;
        let socket = transport.accepted().await.unwrap();
        assert_eq!(socket.query("since_event_id").as_deref(), Some("20"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_only_when_open() {
        let transport = MockTransport::new();
        let client = client(&transport);

        assert!(!client.send(&json!({"foo": "bar"})));

        client.connect(None).await;
        let mut socket = transport.accepted().await.unwrap();
        assert!(client.send(&json!({"foo": "bar"})));
        assert_eq!(
            socket.sent(),
            vec![OutboundFrame::Text(r#"{"foo":"bar"}"#.to_string())]
        );

        socket.close(1006);
        settle().await;
        assert!(!client.send(&json!({"foo": "baz"})));
        assert!(socket.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abnormal_close_reconnects_with_cursor() {
        let transport = MockTransport::new();
        let client = client(&transport);

        client.connect(None).await;
        let socket = transport.accepted().await.unwrap();
        socket.push_text(r#"{"type":"order.updated","data":{},"event_id":"41"}"#);
        socket.close(1006);
        settle().await;

        assert_eq!(client.state(), ConnectionState::Retrying);
        assert_eq!(client.reconnect_attempts(), 1);
        assert_eq!(transport.open_count(), 1);

        tokio::time::sleep(Duration::from_millis(999)).await;
        settle().await;
        assert_eq!(transport.open_count(), 1);

        tokio::time::sleep(Duration::from_millis(1)).await;
        let socket = transport.accepted().await.unwrap();
        assert_eq!(socket.query("since_event_id").as_deref(), Some("41"));
        settle().await;
        assert_eq!(client.state(), ConnectionState::Open);
        assert_eq!(client.reconnect_attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_normal_close_does_not_reconnect() {
        let transport = MockTransport::new();
        let client = client(&transport);

        client.connect(None).await;
        let socket = transport.accepted().await.unwrap();
        socket.close(NORMAL_CLOSURE);
        settle().await;
        assert_eq!(client.state(), ConnectionState::Idle);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(transport.open_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_vanished_socket_counts_as_abnormal() {
        let transport = MockTransport::new();
        let client = client(&transport);

        client.connect(None).await;
        transport.accepted().await.unwrap().drop_connection();
        settle().await;
        assert_eq!(client.state(), ConnectionState::Retrying);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_timeout_resolves_and_retries() {
        let transport = MockTransport::new();
        transport.stall_next(1);
        let client = client(&transport);

        let started = tokio::time::Instant::now();
        client.connect(None).await;
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(5) && waited < Duration::from_secs(6));
        assert_eq!(client.state(), ConnectionState::Retrying);

        tokio::time::sleep(Duration::from_secs(1)).await;
        let _socket = transport.accepted().await.unwrap();
        settle().await;
        assert_eq!(transport.open_count(), 2);
        assert_eq!(client.state(), ConnectionState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_cancels_pending_retry() {
        let transport = MockTransport::new();
        let client = client(&transport);

        client.connect(None).await;
        transport.accepted().await.unwrap().close(1011);
        settle().await;
        assert_eq!(client.state(), ConnectionState::Retrying);

        client.disconnect();
        assert_eq!(client.state(), ConnectionState::Idle);

        tokio::time::sleep(Duration::from_secs(60)).await;
        settle().await;
        assert_eq!(transport.open_count(), 1);
        assert_eq!(client.state(), ConnectionState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_state_stream_reports_transitions() {
        use tokio_stream::StreamExt;

        let transport = MockTransport::new();
        transport.refuse_next(1);
        let client = client(&transport);
        let mut states = client.watch_state();

        client.connect(None).await;
        assert_eq!(*states.borrow_and_update(), ConnectionState::Retrying);

        tokio::time::sleep(Duration::from_secs(1)).await;
        settle().await;
        assert_eq!(*states.borrow_and_update(), ConnectionState::Open);

        let mut stream = client.state_stream();
        assert_eq!(stream.next().await, Some(ConnectionState::Open));
    }
}
