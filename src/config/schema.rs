//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files, and every
//! field has a default so a minimal file only names the service and context.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for a sync client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Service identity and endpoint overrides.
    pub service: ServiceConfig,

    /// Collection/environment to synchronize.
    pub context: ContextConfig,

    /// Timeouts, retry and reconnect tuning.
    pub sync: SyncConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,
}

/// Service identity.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Region the instance lives in (e.g., "us-south").
    pub region: String,

    /// Instance identifier.
    pub guid: String,

    /// API key exchanged for bearer tokens.
    pub apikey: String,

    /// Overrides the region-derived REST base URL.
    pub api_base_url: Option<String>,

    /// Overrides the region-derived WebSocket base URL.
    pub websocket_base_url: Option<String>,

    /// Overrides the token endpoint.
    pub iam_url: Option<String>,
}

/// Which collection/environment to track and how.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContextConfig {
    pub collection_id: String,

    pub environment_id: String,

    /// Local snapshot mirror; required when `live_update` is false.
    pub config_file: Option<PathBuf>,

    /// Keep a live channel open and refresh on change.
    pub live_update: bool,

    /// Reload the snapshot file when it changes (offline mode only).
    pub watch_config_file: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            collection_id: String::new(),
            environment_id: String::new(),
            config_file: None,
            live_update: true,
            watch_config_file: false,
        }
    }
}

/// Timeouts, retry and reconnect settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Upper bound on the synchronous bootstrap fetch inside `set_context`.
    pub bootstrap_timeout_secs: u64,

    /// Per-request timeout for snapshot fetches and token requests.
    pub request_timeout_secs: u64,

    /// Attempts per snapshot fetch (including the first).
    pub fetch_max_attempts: u32,

    pub fetch_base_delay_ms: u64,

    pub fetch_max_delay_ms: u64,

    pub reconnect_base_delay_ms: u64,

    /// Cap on the delay between live channel reconnect attempts.
    pub reconnect_max_delay_ms: u64,

    /// Timeout for the WebSocket handshake.
    pub connect_timeout_secs: u64,

    /// Reconnect when the channel carries no traffic for this long.
    pub idle_timeout_ms: u64,

    /// How long `shutdown` waits for the background task before aborting it.
    pub shutdown_grace_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            bootstrap_timeout_secs: 30,
            request_timeout_secs: 10,
            fetch_max_attempts: 3,
            fetch_base_delay_ms: 500,
            fetch_max_delay_ms: 5_000,
            reconnect_base_delay_ms: 1_000,
            reconnect_max_delay_ms: 60_000,
            connect_timeout_secs: 15,
            idle_timeout_ms: 90_000,
            shutdown_grace_ms: 2_000,
        }
    }
}

impl SyncConfig {
    pub fn bootstrap_timeout(&self) -> Duration {
        Duration::from_secs(self.bootstrap_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,

    /// Expose Prometheus metrics (CLI only).
    pub metrics_enabled: bool,

    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9464".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config: ClientConfig = toml::from_str(
            r#"
            [service]
            region = "us-south"
            guid = "abc"
            apikey = "key"

            [context]
            collection_id = "web"
            environment_id = "dev"
            "#,
        )
        .unwrap();

        assert!(config.context.live_update);
        assert!(config.context.config_file.is_none());
        assert_eq!(config.sync.fetch_max_attempts, 3);
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_offline_toml() {
        let config: ClientConfig = toml::from_str(
            r#"
            [context]
            collection_id = "web"
            environment_id = "dev"
            config_file = "/tmp/appconfig.json"
            live_update = false
            watch_config_file = true

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert!(!config.context.live_update);
        assert!(config.context.watch_config_file);
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }
}
