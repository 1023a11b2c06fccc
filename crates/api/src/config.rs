//! Application configuration loaded from environment variables.

use std::time::Duration;

use service::RelayConfig;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `DATABASE_URL` — PostgreSQL connection string; when unset the
///   server falls back to the in-memory ledger
/// - `OUTBOX_POLL_INTERVAL_MS` — relay poll interval (default: `5000`)
/// - `OUTBOX_BATCH_SIZE` — events claimed per relay cycle (default: `100`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub relay_poll_interval_ms: u64,
    pub relay_batch_size: u32,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            database_url: std::env::var("DATABASE_URL").ok(),
            relay_poll_interval_ms: std::env::var("OUTBOX_POLL_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5000),
            relay_batch_size: std::env::var("OUTBOX_BATCH_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the relay tuning derived from this configuration.
    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            poll_interval: Duration::from_millis(self.relay_poll_interval_ms),
            batch_size: self.relay_batch_size,
            ..RelayConfig::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_url: None,
            relay_poll_interval_ms: 5000,
            relay_batch_size: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert!(config.database_url.is_none());
        assert_eq!(config.relay_poll_interval_ms, 5000);
        assert_eq!(config.relay_batch_size, 100);
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_relay_config_carries_tunables() {
        let config = Config {
            relay_poll_interval_ms: 250,
            relay_batch_size: 10,
            ..Config::default()
        };
        let relay = config.relay_config();
        assert_eq!(relay.poll_interval, Duration::from_millis(250));
        assert_eq!(relay.batch_size, 10);
    }
}
