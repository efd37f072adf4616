//! Server-pushed event types
//!
//! Every inbound text frame carries exactly one event. Events are immutable
//! once parsed and are handed to subscribers by reference.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{RealtimeError, RealtimeResult};

/// A single event pushed by the server on a channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event type tag used to route the event to handlers (e.g. `order.updated`)
    #[serde(rename = "type")]
    pub event_type: String,

    /// Opaque payload; `null` is a valid payload but the field must be present
    pub data: Value,

    /// Server-assigned id, monotonic per channel; used as the resume cursor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,

    /// Server timestamp (RFC 3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    /// Protocol version tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Event {
    /// Create an event with the given type and payload
    pub fn new(event_type: impl Into<String>, data: Value) -> Self {
        Self {
            event_type: event_type.into(),
            data,
            event_id: None,
            timestamp: None,
            version: None,
        }
    }

    /// Builder: attach an event id
    pub fn with_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }

    /// Builder: attach an RFC 3339 timestamp
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp.to_rfc3339());
        self
    }

    /// Builder: attach a protocol version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Parse one inbound frame.
    ///
    /// Fails when the text is not JSON, is not an object, or lacks the
    /// `type` or `data` keys.
    pub fn parse(text: &str) -> RealtimeResult<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| RealtimeError::MalformedEvent(e.to_string()))?;

        let obj = value
            .as_object()
            .ok_or_else(|| RealtimeError::MalformedEvent("event is not a JSON object".to_string()))?;

        // Report a missing payload by name before field-level deserialization
        if !obj.contains_key("data") {
            return Err(RealtimeError::MalformedEvent("missing field `data`".to_string()));
        }

        serde_json::from_value(value).map_err(|e| RealtimeError::MalformedEvent(e.to_string()))
    }

    /// Decode the payload into a concrete type
    pub fn data_as<T: DeserializeOwned>(&self) -> RealtimeResult<T> {
        T::deserialize(&self.data).map_err(|e| RealtimeError::MalformedEvent(e.to_string()))
    }

    /// Server timestamp as UTC, `None` when absent or not RFC 3339
    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        self.timestamp
            .as_deref()
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|ts| ts.with_timezone(&Utc))
    }
}
