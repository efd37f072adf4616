//! Environment configuration and reconnect policy
//!
//! ```bash
//! REALTIME_WS_URL=wss://api.example.com/ws
//! REALTIME_WS_ENABLED=true
//! REALTIME_MAX_RECONNECT_ATTEMPTS=10
//! REALTIME_INITIAL_DELAY_MS=1000
//! REALTIME_MAX_DELAY_MS=30000
//! REALTIME_CONNECT_TIMEOUT_MS=5000
//! ```

use std::{env, fmt::Display, str::FromStr, time::Duration};

use tracing::{debug, warn};

/// Default WebSocket base URL for local development
pub const DEFAULT_WS_URL: &str = "ws://localhost:8000/ws";

/// Retry and timeout parameters of the reconnect loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Retries scheduled before giving up
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for any retry delay
    pub max_delay: Duration,
    /// How long an open attempt may take before it is abandoned
    pub connect_timeout: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            connect_timeout: Duration::from_millis(5000),
        }
    }
}

impl ReconnectPolicy {
    /// Backoff delay for the given 0-indexed attempt:
    /// `min(initial_delay * 2^attempt, max_delay)`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Load overrides from the environment, falling back to the defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_attempts: try_load("REALTIME_MAX_RECONNECT_ATTEMPTS", defaults.max_attempts),
            initial_delay: load_millis("REALTIME_INITIAL_DELAY_MS", defaults.initial_delay),
            max_delay: load_millis("REALTIME_MAX_DELAY_MS", defaults.max_delay),
            connect_timeout: load_millis("REALTIME_CONNECT_TIMEOUT_MS", defaults.connect_timeout),
        }
    }
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealtimeConfig {
    /// Base URL all channel endpoints hang off
    pub ws_base_url: String,
    /// Feature flag; when false endpoint construction fails fast
    pub enabled: bool,
    /// Reconnect loop parameters
    pub policy: ReconnectPolicy,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            ws_base_url: DEFAULT_WS_URL.to_string(),
            enabled: true,
            policy: ReconnectPolicy::default(),
        }
    }
}

impl RealtimeConfig {
    /// Create a config for the given base URL with default policy
    pub fn new(ws_base_url: impl Into<String>) -> Self {
        Self {
            ws_base_url: ws_base_url.into(),
            ..Self::default()
        }
    }

    /// Load configuration from `REALTIME_*` environment variables
    pub fn from_env() -> Self {
        let ws_base_url = env::var("REALTIME_WS_URL").unwrap_or_else(|_| {
            debug!("REALTIME_WS_URL not set, using default: {DEFAULT_WS_URL}");
            DEFAULT_WS_URL.to_string()
        });

        let enabled = match env::var("REALTIME_WS_ENABLED") {
            Ok(raw) => parse_flag(&raw).unwrap_or_else(|| {
                warn!("Invalid REALTIME_WS_ENABLED value `{raw}`, keeping transport enabled");
                true
            }),
            Err(_) => true,
        };

        Self {
            ws_base_url,
            enabled,
            policy: ReconnectPolicy::from_env(),
        }
    }

    /// Builder: override the reconnect policy
    pub fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Builder: toggle the feature flag
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Parse a boolean feature flag (`true/false`, `1/0`, `on/off`, `yes/no`)
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Some(true),
        "false" | "0" | "off" | "no" => Some(false),
        _ => None,
    }
}

fn try_load<T: FromStr + Display + Copy>(key: &str, default: T) -> T
where
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value `{raw}`: {e}, using default: {default}");
            default
        }),
        Err(_) => default,
    }
}

fn load_millis(key: &str, default: Duration) -> Duration {
    let millis = try_load(key, default.as_millis() as u64);
    Duration::from_millis(millis)
}
