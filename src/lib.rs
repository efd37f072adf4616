//! Food Realtime
//!
//! Reconnecting event stream client for the food delivery marketplace's
//! push channels (customer, orders, delivery, admin, chat).
//!
//! # Features
//!
//! - **Best-effort**: `connect` never fails; connectivity problems are retried silently
//! - **Capped backoff**: `min(1s * 2^n, 30s)`, up to 10 retries, 5s connection timeout
//! - **Resume cursor**: every reconnect carries `since_event_id` so missed events are replayed
//! - **Observable state**: `idle | connecting | open | retrying | failed`
//! - **Isolated handlers**: a panicking handler never starves the others
//!
//! # Modules
//!
//! - `types`: Event, connection state, errors
//! - `config`: Environment configuration and reconnect policy
//! - `channel`: Channel endpoints and resume cursor URLs
//! - `transport`: Socket abstraction (tungstenite and in-memory)
//! - `client`: The reconnecting client and handler registry
//! - `dedup`: Duplicate suppression for replayed events
//!
//! # Example
//!
//! ```no_run
//! use food_realtime::{handler, Channel, RealtimeClient, RealtimeConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let config = RealtimeConfig::from_env();
//!     let client = RealtimeClient::new(&config, Channel::Orders(12), "bearer-token")?;
//!
//!     client.on("order.updated", handler(|event| {
//!         println!("order update {:?}: {}", event.event_id, event.data);
//!     }));
//!
//!     client.connect(None).await;
//!     // ... later, when leaving the page
//!     client.disconnect();
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod client;
pub mod config;
pub mod dedup;
pub mod transport;
pub mod types;

// Re-export commonly used items at crate root
pub use channel::{websocket_url, with_resume_cursor, Channel};
pub use client::{handler, EventHandler, RealtimeClient};
pub use config::{RealtimeConfig, ReconnectPolicy};
pub use dedup::{dedup_handler, EventDeduplicator};
pub use transport::{MockTransport, Transport, WsTransport};
pub use types::{ConnectionState, Event, RealtimeError, RealtimeResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
