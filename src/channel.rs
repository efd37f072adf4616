//! Channel endpoints
//!
//! Builds `{base}/{channel}/{id}?token={token}[&since_event_id={cursor}]`.

use url::Url;

use crate::config::RealtimeConfig;
use crate::types::{RealtimeError, RealtimeResult};

/// A logical real-time topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Customer notifications, keyed by customer id
    Customer(u64),
    /// Order feed for a restaurant
    Orders(u64),
    /// Delivery feed for a rider
    Delivery(u64),
    /// Admin-wide feed
    Admin,
    /// Chat room
    Chat(u64),
}

impl Channel {
    /// Path segment of the channel
    pub fn name(&self) -> &'static str {
        match self {
            Channel::Customer(_) => "customer",
            Channel::Orders(_) => "orders",
            Channel::Delivery(_) => "delivery",
            Channel::Admin => "admin",
            Channel::Chat(_) => "chat",
        }
    }

    /// Resource id, `None` for the admin feed
    pub fn id(&self) -> Option<u64> {
        match self {
            Channel::Customer(id)
            | Channel::Orders(id)
            | Channel::Delivery(id)
            | Channel::Chat(id) => Some(*id),
            Channel::Admin => None,
        }
    }

    /// Build a channel from its textual name and optional id
    pub fn parse(name: &str, id: Option<u64>) -> RealtimeResult<Self> {
        let require = |id: Option<u64>| id.ok_or_else(|| RealtimeError::MissingChannelId(name.to_string()));
        match name {
            "customer" => Ok(Channel::Customer(require(id)?)),
            "orders" => Ok(Channel::Orders(require(id)?)),
            "delivery" => Ok(Channel::Delivery(require(id)?)),
            "chat" => Ok(Channel::Chat(require(id)?)),
            "admin" => Ok(Channel::Admin),
            other => Err(RealtimeError::UnknownChannel(other.to_string())),
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.id() {
            Some(id) => write!(f, "{}/{}", self.name(), id),
            None => write!(f, "{}", self.name()),
        }
    }
}

/// Build the endpoint URL for a channel.
///
/// Fails fast when the transport is disabled or the base URL is not a
/// `ws://` / `wss://` URL. This is the only hard failure surfaced to callers.
pub fn websocket_url(config: &RealtimeConfig, channel: Channel, token: &str) -> RealtimeResult<Url> {
    if !config.enabled {
        return Err(RealtimeError::Disabled);
    }

    let base = Url::parse(config.ws_base_url.trim_end_matches('/'))?;
    if !matches!(base.scheme(), "ws" | "wss") {
        return Err(RealtimeError::InvalidUrl(format!(
            "expected ws:// or wss:// scheme, got {}://",
            base.scheme()
        )));
    }
    if base.cannot_be_a_base() {
        return Err(RealtimeError::InvalidUrl(config.ws_base_url.clone()));
    }

    let raw = format!(
        "{}/{}?token={}",
        base.as_str().trim_end_matches('/'),
        channel,
        urlencoding::encode(token)
    );
    Ok(Url::parse(&raw)?)
}

/// Return `url` with `since_event_id` set to `cursor`, or unchanged when there is none
pub fn with_resume_cursor(url: &Url, cursor: Option<&str>) -> Url {
    let mut url = url.clone();
    let Some(cursor) = cursor else {
        return url;
    };

    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "since_event_id")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    url.query_pairs_mut()
        .clear()
        .extend_pairs(retained)
        .append_pair("since_event_id", cursor);
    url
}
