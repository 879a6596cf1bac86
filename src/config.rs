//! Configuration management for the tap monitor
//!
//! This module provides runtime configuration loading from JSON files so the
//! endpoint, reconnect schedule and export location can be changed without
//! recompiling. Every section falls back to its defaults, which match the
//! behaviour of the dashboard the pipeline was built for.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use crate::error::ConnectionError;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub connection: ConnectionConfig,
    pub reconnect: ReconnectConfig,
    pub throughput: ThroughputConfig,
    pub telemetry: TelemetryConfig,
    pub export: ExportConfig,
}

/// Endpoint of the tap stream
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Host (and optional port) serving the stream
    pub host: String,
    /// Path of the upgrade endpoint
    pub path: String,
    /// Use wss:// instead of ws://
    pub secure: bool,
    /// Full URL override; when set, host/path/secure are ignored
    pub url: Option<String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1:5000".to_string(),
            path: "/ws".to_string(),
            secure: false,
            url: None,
        }
    }
}

impl ConnectionConfig {
    /// Resolve the endpoint URL.
    ///
    /// The scheme mirrors the transport security of the serving page:
    /// `secure` selects `wss`, otherwise `ws`.
    pub fn endpoint(&self) -> Result<Url, ConnectionError> {
        let raw = match &self.url {
            Some(url) => url.clone(),
            None => {
                let scheme = if self.secure { "wss" } else { "ws" };
                let path = if self.path.starts_with('/') {
                    self.path.clone()
                } else {
                    format!("/{}", self.path)
                };
                format!("{}://{}{}", scheme, self.host, path)
            }
        };

        let url = Url::parse(&raw).map_err(|err| ConnectionError::InvalidEndpoint {
            url: raw.clone(),
            reason: err.to_string(),
        })?;

        match url.scheme() {
            "ws" | "wss" => Ok(url),
            other => Err(ConnectionError::InvalidEndpoint {
                url: raw,
                reason: format!("unsupported scheme '{}'", other),
            }),
        }
    }
}

/// Exponential backoff schedule for automatic reconnection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Delay before the first retry
    pub base_delay_ms: u64,
    /// Upper bound on any single delay
    pub max_delay_ms: u64,
    /// Retries scheduled before giving up
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            max_attempts: 5,
        }
    }
}

/// Throughput reporting cadence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThroughputConfig {
    pub tick_ms: u64,
}

impl Default for ThroughputConfig {
    fn default() -> Self {
        Self { tick_ms: 1_000 }
    }
}

impl ThroughputConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }
}

/// Telemetry collector sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Broadcast channel buffer (lagging subscribers lose older events)
    pub channel_capacity: usize,
    /// Events retained in the snapshot history
    pub history_capacity: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
            history_capacity: 64,
        }
    }
}

/// Export destination
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub output_dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The loaded configuration, or the defaults if the file is missing or
    /// the JSON is invalid (a warning is logged in both cases).
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.reconnect.base_delay_ms, 1_000);
        assert_eq!(config.reconnect.max_delay_ms, 30_000);
        assert_eq!(config.reconnect.max_attempts, 5);
        assert_eq!(config.throughput.tick_ms, 1_000);
        assert_eq!(config.connection.path, "/ws");
    }

    #[test]
    fn test_endpoint_mirrors_transport_security() {
        let mut connection = ConnectionConfig {
            host: "panel.local:8080".to_string(),
            ..ConnectionConfig::default()
        };
        assert_eq!(
            connection.endpoint().unwrap().as_str(),
            "ws://panel.local:8080/ws"
        );

        connection.secure = true;
        assert_eq!(
            connection.endpoint().unwrap().as_str(),
            "wss://panel.local:8080/ws"
        );
    }

    #[test]
    fn test_endpoint_override_and_scheme_check() {
        let connection = ConnectionConfig {
            url: Some("ws://10.0.0.2:9000/taps".to_string()),
            ..ConnectionConfig::default()
        };
        assert_eq!(
            connection.endpoint().unwrap().as_str(),
            "ws://10.0.0.2:9000/taps"
        );

        let connection = ConnectionConfig {
            url: Some("http://10.0.0.2/ws".to_string()),
            ..ConnectionConfig::default()
        };
        assert!(matches!(
            connection.endpoint(),
            Err(ConnectionError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "reconnect": {{ "max_attempts": 3 }} }}"#).unwrap();

        let config = AppConfig::load_from_file(file.path());
        assert_eq!(config.reconnect.max_attempts, 3);
        assert_eq!(config.reconnect.base_delay_ms, 1_000);
        assert_eq!(config.connection.host, "127.0.0.1:5000");
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from_file("/nonexistent/tap_monitor.json");
        assert_eq!(config.telemetry.history_capacity, 64);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = AppConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.reconnect.max_attempts, config.reconnect.max_attempts);
        assert_eq!(parsed.connection.host, config.connection.host);
    }
}
