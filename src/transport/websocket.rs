//! WebSocket transport on tokio-tungstenite

use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, Message};
use tokio_tungstenite::connect_async;
use tracing::debug;
use url::Url;

use super::{InboundFrame, OutboundFrame, Transport, TransportLink};
use crate::types::{RealtimeResult, ABNORMAL_CLOSURE, NORMAL_CLOSURE};

/// Production transport: one TCP/TLS WebSocket per link
#[derive(Debug, Clone, Copy, Default)]
pub struct WsTransport;

impl WsTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Transport for WsTransport {
    async fn open(&self, url: &Url) -> RealtimeResult<TransportLink> {
        let (ws, _response) = connect_async(url.as_str()).await?;
        let (mut sink, mut stream) = ws.split();
        let (link, mut outbound, inbound) = TransportLink::pair();

        // Pump frames between the socket and the link until either side closes
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    frame = outbound.recv() => {
                        let (message, code) = match frame {
                            Some(OutboundFrame::Text(text)) => {
                                if let Err(e) = sink.send(Message::Text(text)).await {
                                    debug!(error = %e, "WebSocket write failed");
                                    let _ = inbound.send(InboundFrame::Closed(Some(ABNORMAL_CLOSURE)));
                                    break;
                                }
                                continue;
                            }
                            Some(OutboundFrame::Close(code)) => (close_message(code), code),
                            // Client dropped the link
                            None => (close_message(NORMAL_CLOSURE), NORMAL_CLOSURE),
                        };
                        let _ = sink.send(message).await;
                        let _ = sink.close().await;
                        let _ = inbound.send(InboundFrame::Closed(Some(code)));
                        break;
                    }

                    message = stream.next() => {
                        match message {
                            Some(Ok(Message::Text(text))) => {
                                if inbound.send(InboundFrame::Text(text)).is_err() {
                                    break;
                                }
                            }
                            Some(Ok(Message::Close(frame))) => {
                                let code = frame.map(|f| u16::from(f.code));
                                let _ = inbound.send(InboundFrame::Closed(code));
                                // Flush tungstenite's queued close reply
                                let _ = sink.close().await;
                                break;
                            }
                            // Binary frames are not part of the protocol; pings are answered by tungstenite
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                debug!(error = %e, "WebSocket read failed");
                                let _ = inbound.send(InboundFrame::Closed(Some(ABNORMAL_CLOSURE)));
                                break;
                            }
                            None => {
                                let _ = inbound.send(InboundFrame::Closed(Some(ABNORMAL_CLOSURE)));
                                break;
                            }
                        }
                    }
                }
            }
        });

        Ok(link)
    }
}

fn close_message(code: u16) -> Message {
    Message::Close(Some(CloseFrame {
        code: CloseCode::from(code),
        reason: "".into(),
    }))
}
