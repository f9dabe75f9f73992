//! Runtime configuration
//!
//! All settings come from environment variables (optionally seeded from a `.env`
//! file by `dotenvy` in `main`). Unparsable values fall back to their defaults,
//! the same way the server has always treated `PORT`.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Default number of requests a client may make per rate-limit window
pub const DEFAULT_RATE_LIMIT_MAX: u32 = 100;

/// Default rate-limit window length in seconds
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Default cap for JSON request bodies (5 MiB)
pub const DEFAULT_MAX_JSON_BYTES: usize = 5 * 1024 * 1024;

/// Default cap for multipart uploads (200 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 200 * 1024 * 1024;

/// Default tracing filter when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "forge_api=info,tower_http=info";

/// Deployment environment, controls how much internal detail leaks into errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            "test" => Some(Self::Test),
            _ => None,
        }
    }

    /// Only development builds include internal diagnostics in error responses
    pub fn exposes_error_details(self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Wire format used by `POST /api/exportZip`
///
/// A deployment picks exactly one of these; clients should not expect both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportMode {
    /// Archive bytes are the HTTP body (`application/zip` attachment)
    Stream,
    /// Archive is base64-encoded inside the JSON success envelope
    Base64,
}

impl ExportMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stream" => Some(Self::Stream),
            "base64" => Some(Self::Base64),
            _ => None,
        }
    }
}

/// Fixed-window rate limit settings
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Requests allowed per window for a single client
    pub max_requests: u32,
    /// Window length
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_RATE_LIMIT_MAX,
            window: Duration::from_secs(DEFAULT_RATE_LIMIT_WINDOW_SECS),
        }
    }
}

/// Application configuration
///
/// # Environment Variables
///
/// - `HOST` - Bind address (default: `0.0.0.0`)
/// - `PORT` - Server port number (default: 8080)
/// - `APP_ENV` - `development`, `production` or `test` (default: `production`)
/// - `RATE_LIMIT_MAX` - Requests per window per client (default: 100)
/// - `RATE_LIMIT_WINDOW_SECS` - Window length (default: 60)
/// - `EXPORT_MODE` - `stream` or `base64` (default: `stream`)
/// - `MAX_JSON_BYTES` / `MAX_UPLOAD_BYTES` - Body size caps
/// - `RUST_LOG` - Tracing filter
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    pub rate_limit: RateLimitConfig,
    pub export_mode: ExportMode,
    pub max_json_bytes: usize,
    pub max_upload_bytes: usize,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Config {
    /// Reads the configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup
    ///
    /// Tests use this to avoid touching the real process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let window_secs: u64 = parsed(&lookup, "RATE_LIMIT_WINDOW_SECS")
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_RATE_LIMIT_WINDOW_SECS);

        Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parsed(&lookup, "PORT").unwrap_or(8080),
            environment: lookup("APP_ENV")
                .and_then(|raw| Environment::parse(&raw))
                .unwrap_or(Environment::Production),
            rate_limit: RateLimitConfig {
                max_requests: parsed(&lookup, "RATE_LIMIT_MAX").unwrap_or(DEFAULT_RATE_LIMIT_MAX),
                window: Duration::from_secs(window_secs),
            },
            export_mode: lookup("EXPORT_MODE")
                .and_then(|raw| ExportMode::parse(&raw))
                .unwrap_or(ExportMode::Stream),
            max_json_bytes: parsed(&lookup, "MAX_JSON_BYTES").unwrap_or(DEFAULT_MAX_JSON_BYTES),
            max_upload_bytes: parsed(&lookup, "MAX_UPLOAD_BYTES").unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            log_filter: lookup("RUST_LOG")
                .filter(|filter| !filter.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        }
    }

    /// `host:port` string for binding the listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Parses a variable, treating missing or malformed values as absent
fn parsed<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|raw| raw.trim().parse().ok())
}
