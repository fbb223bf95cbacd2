//! Relay server configuration.
//!
//! Configuration is loaded from environment variables with sensible
//! defaults; unparsable optional values fall back to the default.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

/// Default broadcast socket bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:5570";

/// Default heartbeat interval in milliseconds.
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 2_000;

/// Relay server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Broadcast socket bind address (default: "0.0.0.0:5570").
    pub bind_address: String,

    /// Interval between heartbeat broadcasts (default: 2 seconds).
    pub heartbeat_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    #[must_use]
    pub fn from_vars(vars: &HashMap<String, String>) -> Self {
        let bind_address = vars
            .get("RELAY_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        // A zero interval cannot drive a ticker; treat it like any other
        // unparsable value.
        let heartbeat_ms = vars
            .get("RELAY_HEARTBEAT_INTERVAL_MS")
            .and_then(|s| s.parse().ok())
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_HEARTBEAT_INTERVAL_MS);

        Config {
            bind_address,
            heartbeat_interval: Duration::from_millis(heartbeat_ms),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_vars(&HashMap::new())
    }
}
