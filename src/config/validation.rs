//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, base delay <= cap)
//! - Validate endpoint overrides and the metrics address
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Identity arguments are checked by `init`/`set_context`, not here

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::ClientConfig;

/// A single semantic problem in a configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigViolation {
    pub field: &'static str,
    pub message: String,
}

impl ConfigViolation {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validates a parsed configuration.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ConfigViolation>> {
    let mut errors = Vec::new();
    let sync = &config.sync;

    let positive = [
        ("sync.bootstrap_timeout_secs", sync.bootstrap_timeout_secs),
        ("sync.request_timeout_secs", sync.request_timeout_secs),
        ("sync.connect_timeout_secs", sync.connect_timeout_secs),
        ("sync.idle_timeout_ms", sync.idle_timeout_ms),
        ("sync.reconnect_base_delay_ms", sync.reconnect_base_delay_ms),
        ("sync.fetch_base_delay_ms", sync.fetch_base_delay_ms),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ConfigViolation::new(field, "must be greater than zero"));
        }
    }

    if sync.fetch_max_attempts == 0 {
        errors.push(ConfigViolation::new("sync.fetch_max_attempts", "must be at least 1"));
    }
    if sync.reconnect_base_delay_ms > sync.reconnect_max_delay_ms {
        errors.push(ConfigViolation::new(
            "sync.reconnect_max_delay_ms",
            "must not be below reconnect_base_delay_ms",
        ));
    }
    if sync.fetch_base_delay_ms > sync.fetch_max_delay_ms {
        errors.push(ConfigViolation::new(
            "sync.fetch_max_delay_ms",
            "must not be below fetch_base_delay_ms",
        ));
    }

    let overrides = [
        ("service.api_base_url", &config.service.api_base_url),
        ("service.websocket_base_url", &config.service.websocket_base_url),
        ("service.iam_url", &config.service.iam_url),
    ];
    for (field, value) in overrides {
        if let Some(raw) = value {
            if let Err(e) = url::Url::parse(raw) {
                errors.push(ConfigViolation::new(field, format!("invalid URL '{}': {}", raw, e)));
            }
        }
    }

    if config.context.watch_config_file && config.context.config_file.is_none() {
        errors.push(ConfigViolation::new(
            "context.watch_config_file",
            "requires context.config_file",
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ConfigViolation::new(
            "observability.metrics_address",
            format!("invalid socket address '{}'", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ClientConfig::default()).is_ok());
    }

    #[test]
    fn test_reports_every_problem() {
        let mut config = ClientConfig::default();
        config.sync.idle_timeout_ms = 0;
        config.sync.fetch_max_attempts = 0;
        config.sync.reconnect_base_delay_ms = 10_000;
        config.sync.reconnect_max_delay_ms = 1_000;
        config.service.api_base_url = Some("not a url".to_string());

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(errors.len(), 4);
        assert!(fields.contains(&"sync.idle_timeout_ms"));
        assert!(fields.contains(&"sync.fetch_max_attempts"));
        assert!(fields.contains(&"sync.reconnect_max_delay_ms"));
        assert!(fields.contains(&"service.api_base_url"));
    }

    #[test]
    fn test_watch_requires_file() {
        let mut config = ClientConfig::default();
        config.context.watch_config_file = true;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "context.watch_config_file");
    }
}
