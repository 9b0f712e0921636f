//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `HACKSHOP_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `HACKSHOP_HOST` - Bind address (default: 127.0.0.1)
//! - `HACKSHOP_PORT` - Listen port (default: 5000)
//! - `HACKSHOP_UPLOAD_DIR` - Where uploaded images and spreadsheets land (default: uploads)
//! - `HACKSHOP_PRODUCT_JSON` - Catalogue imported by `/setup` (default: product.json)
//! - `HACKSHOP_STATIC_DIR` - Static assets (default: crates/server/static)
//! - `HACKSHOP_LOG_FORMAT` - `text` or `json` (default: text)
//! - `DB_POOL_SIZE` / `DB_POOL_MIN` / `DB_POOL_TIMEOUT` - Pool tuning (10 / 2 / 30s)
//! - `HACKSHOP_MAIL_RATE_SECONDS` / `HACKSHOP_MAIL_RATE_BURST` - `/send_mail` limit per
//!   client IP: one request replenished every N seconds, up to a burst (3 / 5)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::num::{NonZeroU32, NonZeroU64};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "plain" | "" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("expected text or json, got {other}")),
        }
    }
}

/// Database pool tuning.
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
}

/// Per-IP limit on verification-code mails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MailRateConfig {
    /// Seconds to replenish one request
    pub replenish_seconds: NonZeroU64,
    /// Requests allowed back to back
    pub burst: NonZeroU32,
}

impl Default for MailRateConfig {
    fn default() -> Self {
        Self {
            replenish_seconds: NonZeroU64::MIN.saturating_add(2),
            burst: NonZeroU32::MIN.saturating_add(4),
        }
    }
}

/// HackShop application configuration.
#[derive(Debug, Clone)]
pub struct HackshopConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Directory for uploaded files, served under `/uploads`
    pub upload_dir: PathBuf,
    /// Catalogue file consumed by the one-shot setup page
    pub product_json: PathBuf,
    /// Static asset directory, served under `/static`
    pub static_dir: PathBuf,
    /// Pool tuning
    pub pool: PoolConfig,
    /// `/send_mail` rate limit
    pub mail_rate: MailRateConfig,
    /// Log output format
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "production", "staging")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate
    pub sentry_sample_rate: f32,
    /// Sentry transaction sample rate
    pub sentry_traces_sample_rate: f32,
}

impl HackshopConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the database URL is missing or a value fails
    /// to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("HACKSHOP_DATABASE_URL")?;
        let host = parse_env("HACKSHOP_HOST", "127.0.0.1")?;
        let port = parse_env("HACKSHOP_PORT", "5000")?;

        let pool = PoolConfig {
            max_connections: parse_env("DB_POOL_SIZE", "10")?,
            min_connections: parse_env("DB_POOL_MIN", "2")?,
            acquire_timeout: Duration::from_secs(parse_env("DB_POOL_TIMEOUT", "30")?),
        };

        let mail_rate = MailRateConfig {
            replenish_seconds: parse_env("HACKSHOP_MAIL_RATE_SECONDS", "3")?,
            burst: parse_env("HACKSHOP_MAIL_RATE_BURST", "5")?,
        };

        let log_format = get_env_or_default("HACKSHOP_LOG_FORMAT", "text")
            .parse::<LogFormat>()
            .map_err(|e| ConfigError::InvalidEnvVar("HACKSHOP_LOG_FORMAT".to_string(), e))?;

        Ok(Self {
            database_url,
            host,
            port,
            upload_dir: get_env_or_default("HACKSHOP_UPLOAD_DIR", "uploads").into(),
            product_json: get_env_or_default("HACKSHOP_PRODUCT_JSON", "product.json").into(),
            static_dir: get_env_or_default("HACKSHOP_STATIC_DIR", "crates/server/static").into(),
            pool,
            mail_rate,
            log_format,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Lock file written once setup has imported the catalogue.
    #[must_use]
    pub fn setup_lock_path(&self) -> PathBuf {
        let mut name = self.product_json.clone().into_os_string();
        name.push(".lock");
        PathBuf::from(name)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(key, &get_env_or_default(key, default))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_port() {
        let port: u16 = parse_value("HACKSHOP_PORT", " 5000 ").unwrap();
        assert_eq!(port, 5000);
    }

    #[test]
    fn test_parse_value_invalid() {
        let result: Result<u16, _> = parse_value("HACKSHOP_PORT", "not-a-port");
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(key, _)) if key == "HACKSHOP_PORT"));
    }

    #[test]
    fn test_parse_value_ip() {
        let host: IpAddr = parse_value("HACKSHOP_HOST", "0.0.0.0").unwrap();
        assert!(host.is_unspecified());
    }

    #[test]
    fn test_mail_rate_rejects_zero() {
        let result: Result<NonZeroU32, _> = parse_value("HACKSHOP_MAIL_RATE_BURST", "0");
        assert!(result.is_err());
        let burst: NonZeroU32 = parse_value("HACKSHOP_MAIL_RATE_BURST", "1000").unwrap();
        assert_eq!(burst.get(), 1000);
    }

    #[test]
    fn test_mail_rate_default() {
        let rate = MailRateConfig::default();
        assert_eq!(rate.replenish_seconds.get(), 3);
        assert_eq!(rate.burst.get(), 5);
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("json".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("TEXT".parse::<LogFormat>(), Ok(LogFormat::Text));
        assert!("yaml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_setup_lock_path_appends_suffix() {
        let config = HackshopConfig {
            database_url: SecretString::from("postgres://localhost/hackshop"),
            host: "127.0.0.1".parse().unwrap(),
            port: 5000,
            upload_dir: "uploads".into(),
            product_json: "data/product.json".into(),
            static_dir: "static".into(),
            pool: PoolConfig {
                max_connections: 10,
                min_connections: 2,
                acquire_timeout: Duration::from_secs(30),
            },
            mail_rate: MailRateConfig::default(),
            log_format: LogFormat::Text,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };
        assert_eq!(
            config.setup_lock_path(),
            PathBuf::from("data/product.json.lock")
        );
        assert_eq!(config.socket_addr().port(), 5000);
    }
}
