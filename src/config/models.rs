//! Configuration data structures for Decoy.
//!
//! These types map directly to TOML (also JSON / YAML) configuration files.
//! They are intentionally serde-friendly and include defaults so the server
//! stays usable with a minimal config file or none at all. Durations are
//! written as humantime strings ("5m", "10s").

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default listen port, overridable from the CLI.
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    pub listen_addr: String,

    /// How long a registered endpoint policy lives without being replaced
    /// or consumed.
    #[serde(with = "humantime_duration")]
    pub registry_ttl: Duration,

    /// How long a recorded request stays in the history window. Short on
    /// purpose: history is a rolling debug window, not an audit log.
    #[serde(with = "humantime_duration")]
    pub history_ttl: Duration,

    /// Interval between background eviction sweeps.
    #[serde(with = "humantime_duration")]
    pub sweep_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: format!("127.0.0.1:{DEFAULT_PORT}"),
            registry_ttl: Duration::from_secs(5 * 60),
            history_ttl: Duration::from_secs(10),
            sweep_interval: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    /// Replace the port of `listen_addr`, keeping the host part.
    pub fn with_port(mut self, port: u16) -> Self {
        let host = self
            .listen_addr
            .rsplit_once(':')
            .map(|(host, _)| host)
            .unwrap_or("127.0.0.1");
        self.listen_addr = format!("{host}:{port}");
        self
    }
}

mod humantime_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(D::Error::custom)
    }
}
