//! Application configuration loaded from environment variables.

use std::time::Duration;

use common::OrderStatus;
use domain::{DEFAULT_NOTIFICATION_TIMEOUT, EntryStatusPolicy};
use statistics::DEFAULT_TOP_PRODUCTS;
use thiserror::Error;

/// Errors raised while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" | "text" | "pretty" => Ok(LogFormat::Plain),
            "json" => Ok(LogFormat::Json),
            _ => Err(()),
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` - bind address (default: `"0.0.0.0"`)
/// - `PORT` - listen port (default: `3000`)
/// - `RUST_LOG` - tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT` - `plain` or `json` (default: `plain`)
/// - `DATABASE_URL` - PostgreSQL URL; the in-memory store is used when unset
/// - `DATABASE_MAX_CONNECTIONS` - pool size (default: `10`)
/// - `ORDER_ENTRY_STATUS_AUTHENTICATED` - initial status of authenticated orders (default: `COMPLETED`)
/// - `ORDER_ENTRY_STATUS_GUEST` - initial status of guest orders (default: `PENDING`)
/// - `NOTIFICATION_TIMEOUT_MS` - bound on one notification attempt (default: `5000`)
/// - `STATS_TOP_PRODUCTS` - top sellers per report (default: `10`)
/// - `ADMIN_USERNAME` - administrator seeded into the user directory (default: `"admin"`)
/// - `CUSTOMER_USERNAMES` - comma-separated customers seeded into the user directory
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub entry_status: EntryStatusPolicy,
    pub notification_timeout: Duration,
    pub stats_top_products: usize,
    pub admin_username: String,
    pub customer_usernames: Vec<String>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let status = |name: &'static str, default: OrderStatus| match var(name) {
            Some(value) => value
                .parse::<OrderStatus>()
                .map_err(|_| ConfigError::Invalid { name, value }),
            None => Ok(default),
        };

        Ok(Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: var("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: var("LOG_FORMAT")
                .and_then(|f| f.parse().ok())
                .unwrap_or(defaults.log_format),
            database_url: var("DATABASE_URL"),
            database_max_connections: var("DATABASE_MAX_CONNECTIONS")
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.database_max_connections),
            entry_status: EntryStatusPolicy::new(
                status(
                    "ORDER_ENTRY_STATUS_AUTHENTICATED",
                    defaults.entry_status.authenticated,
                )?,
                status("ORDER_ENTRY_STATUS_GUEST", defaults.entry_status.guest)?,
            ),
            notification_timeout: var("NOTIFICATION_TIMEOUT_MS")
                .and_then(|ms| ms.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.notification_timeout),
            stats_top_products: var("STATS_TOP_PRODUCTS")
                .and_then(|n| n.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.stats_top_products),
            admin_username: var("ADMIN_USERNAME").unwrap_or(defaults.admin_username),
            customer_usernames: var("CUSTOMER_USERNAMES")
                .map(|names| {
                    names
                        .split(',')
                        .map(str::trim)
                        .filter(|name| !name.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Plain,
            database_url: None,
            database_max_connections: 10,
            entry_status: EntryStatusPolicy::default(),
            notification_timeout: DEFAULT_NOTIFICATION_TIMEOUT,
            stats_top_products: DEFAULT_TOP_PRODUCTS,
            admin_username: "admin".to_string(),
            customer_usernames: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Plain);
        assert!(config.database_url.is_none());
        assert_eq!(config.entry_status, EntryStatusPolicy::default());
        assert_eq!(config.notification_timeout, Duration::from_secs(5));
        assert_eq!(config.stats_top_products, 10);
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
    fn test_empty_environment_uses_defaults() {
        let config = from_pairs(&[]).unwrap();
        assert_eq!(config.addr(), "0.0.0.0:3000");
        assert_eq!(config.admin_username, "admin");
        assert!(config.customer_usernames.is_empty());
    }

    #[test]
    fn test_values_are_read() {
        let config = from_pairs(&[
            ("PORT", "8081"),
            ("LOG_FORMAT", "json"),
            ("DATABASE_URL", "postgres://localhost/orders"),
            ("ORDER_ENTRY_STATUS_AUTHENTICATED", "pending"),
            ("NOTIFICATION_TIMEOUT_MS", "250"),
            ("STATS_TOP_PRODUCTS", "3"),
            ("CUSTOMER_USERNAMES", "alice, bob,,"),
        ])
        .unwrap();

        assert_eq!(config.port, 8081);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/orders")
        );
        assert_eq!(config.entry_status.authenticated, OrderStatus::Pending);
        assert_eq!(config.entry_status.guest, OrderStatus::Pending);
        assert_eq!(config.notification_timeout, Duration::from_millis(250));
        assert_eq!(config.stats_top_products, 3);
        assert_eq!(config.customer_usernames, vec!["alice", "bob"]);
    }

    #[test]
    fn test_unparseable_numbers_fall_back() {
        let config = from_pairs(&[("PORT", "eighty"), ("STATS_TOP_PRODUCTS", "0")]).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.stats_top_products, 10);
    }

    #[test]
    fn test_unknown_entry_status_is_rejected() {
        let result = from_pairs(&[("ORDER_ENTRY_STATUS_GUEST", "SHIPPED")]);
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                name: "ORDER_ENTRY_STATUS_GUEST",
                ..
            })
        ));
    }
}
