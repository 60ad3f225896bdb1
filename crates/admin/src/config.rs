//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ADMIN_BASE_URL` - Public URL for the admin dashboard
//!
//! ## Optional
//! - `ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `ADMIN_PORT` - Listen port (default: 3001)
//! - `BOT_API_URL` - Bot backend REST API base URL (default: <http://localhost:5000/api>)
//! - `BOT_API_TIMEOUT_SECS` - Backend request timeout (default: 30)
//! - `QUERY_CACHE_TTL_SECS` - Lifetime of cached listings (default: 30)
//! - `QUERY_CACHE_CAPACITY` - Maximum cached listings (default: 1000)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` / `SENTRY_TRACES_SAMPLE_RATE` - Sample rates (default: 1.0)
//!
//! ## Optional (TLS)
//! - `ADMIN_TLS_CERT` - PEM-encoded certificate chain
//! - `ADMIN_TLS_KEY` - PEM-encoded private key

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Default bot backend URL used during local development.
pub const DEFAULT_BOT_API_URL: &str = "http://localhost:5000/api";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CACHE_TTL_SECS: u64 = 30;
const DEFAULT_CACHE_CAPACITY: u64 = 1000;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Admin application configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the admin dashboard
    pub base_url: String,
    /// Bot backend API configuration
    pub bot_api: BotApiConfig,
    /// Query cache configuration
    pub cache: CacheConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
    /// TLS configuration for HTTPS (optional)
    pub tls: Option<TlsConfig>,
}

/// Bot backend REST API configuration.
#[derive(Debug, Clone)]
pub struct BotApiConfig {
    /// Base URL; endpoint paths such as `/admin/users` are appended to it.
    pub base_url: Url,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for BotApiConfig {
    #[allow(clippy::expect_used)]
    fn default() -> Self {
        Self {
            base_url: parse_base_url(DEFAULT_BOT_API_URL).expect("valid default bot API URL"),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Query cache sizing.
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    /// How long a cached listing stays fresh.
    pub ttl: Duration,
    /// Maximum number of cached listings.
    pub capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// TLS configuration for HTTPS.
#[derive(Clone)]
pub struct TlsConfig {
    /// PEM-encoded certificate chain
    pub cert_pem: String,
    /// PEM-encoded private key
    pub key_pem: SecretString,
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("cert_pem", &"[CERTIFICATE]")
            .field("key_pem", &"[REDACTED]")
            .finish()
    }
}

impl TlsConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let cert_pem = get_optional_env("ADMIN_TLS_CERT");
        let key_pem = get_optional_env("ADMIN_TLS_KEY");

        match (cert_pem, key_pem) {
            (Some(cert), Some(key)) => Ok(Some(Self {
                cert_pem: cert,
                key_pem: SecretString::from(key),
            })),
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "ADMIN_TLS_*".to_string(),
                "Both ADMIN_TLS_CERT and ADMIN_TLS_KEY must be set together".to_string(),
            )),
        }
    }
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("ADMIN_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_HOST".to_string(), e.to_string()))?;
        let port = parse_env_or_default("ADMIN_PORT", 3001_u16)?;
        let base_url = get_required_env("ADMIN_BASE_URL")?;

        let bot_api = BotApiConfig::from_env()?;
        let cache = CacheConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let tls = TlsConfig::from_env()?;

        Ok(Self {
            host,
            port,
            base_url,
            bot_api,
            cache,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
            tls,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the dashboard is served over HTTPS (decides Secure cookies).
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl BotApiConfig {
    /// Load the backend settings from environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` for an unparsable URL or timeout.
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = get_env_or_default("BOT_API_URL", DEFAULT_BOT_API_URL);
        let base_url = parse_base_url(&raw)
            .map_err(|e| ConfigError::InvalidEnvVar("BOT_API_URL".to_string(), e))?;
        let timeout = Duration::from_secs(parse_env_or_default(
            "BOT_API_TIMEOUT_SECS",
            DEFAULT_TIMEOUT_SECS,
        )?);
        Ok(Self { base_url, timeout })
    }
}

impl CacheConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            ttl: Duration::from_secs(parse_env_or_default(
                "QUERY_CACHE_TTL_SECS",
                DEFAULT_CACHE_TTL_SECS,
            )?),
            capacity: parse_env_or_default("QUERY_CACHE_CAPACITY", DEFAULT_CACHE_CAPACITY)?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse and normalise the backend base URL.
///
/// Only http(s) is accepted. A trailing slash is ensured so that relative
/// endpoint paths join below the API prefix instead of replacing it.
///
/// # Errors
///
/// Returns a description of the problem when the URL is unusable.
pub fn parse_base_url(raw: &str) -> Result<Url, String> {
    let mut url = Url::parse(raw.trim()).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to a default when unset.
fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_config(base_url: &str) -> AdminConfig {
        AdminConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3001,
            base_url: base_url.to_string(),
            bot_api: BotApiConfig::default(),
            cache: CacheConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 1.0,
            tls: None,
        }
    }

    #[test]
    fn test_socket_addr() {
        let addr = test_config("http://localhost:3001").socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3001);
    }

    #[test]
    fn test_is_secure() {
        assert!(!test_config("http://localhost:3001").is_secure());
        assert!(test_config("https://admin.example.com").is_secure());
    }

    #[test]
    fn test_parse_base_url_appends_slash() {
        let url = parse_base_url("https://bot.example.com/api").unwrap();
        assert_eq!(url.as_str(), "https://bot.example.com/api/");
        assert_eq!(
            url.join("admin/users").unwrap().as_str(),
            "https://bot.example.com/api/admin/users"
        );
    }

    #[test]
    fn test_parse_base_url_rejects_other_schemes() {
        assert!(parse_base_url("ftp://bot.example.com").is_err());
        assert!(parse_base_url("not a url").is_err());
    }

    #[test]
    fn test_default_bot_api() {
        let api = BotApiConfig::default();
        assert_eq!(api.base_url.as_str(), "http://localhost:5000/api/");
        assert_eq!(api.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_tls_config_debug_redacts_key() {
        let tls = TlsConfig {
            cert_pem: "-----BEGIN CERTIFICATE-----".to_string(),
            key_pem: SecretString::from("super_secret_private_key"),
        };

        let debug_output = format!("{tls:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_private_key"));
    }
}
