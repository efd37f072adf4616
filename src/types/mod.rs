//! Data types for the realtime client
//!
//! Events, connection status and the crate error type.

mod error;
mod event;
mod state;

pub use error::{RealtimeError, RealtimeResult};
pub use event::Event;
pub use state::ConnectionState;

/// Close code for an intentional, non-retriable closure
pub const NORMAL_CLOSURE: u16 = 1000;

/// Close code reported when the socket vanished without a close frame
pub const ABNORMAL_CLOSURE: u16 = 1006;
