//! Runtime configuration from the environment (and `.env` when present).

use crate::error::ConfigError;
use crate::sql::PaginationConfig;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub api_host: String,
    pub api_port: u16,
    /// Require the `tracer_uid`, `user_uid`, `site_uid` headers on API routes.
    pub enforce_headers: bool,
    pub shutdown_timeout: Duration,
    pub db_max_open_conns: u32,
    /// Pool floor: connections kept open even when idle.
    pub db_min_conns: u32,
    /// Longest wait for the write-serialization lock.
    pub tran_lock_timeout: Duration,
    pub status_check_timeout: Duration,
    pub pagination: PaginationConfig,
    pub max_body_bytes: usize,
    pub app_version: String,
}

impl Config {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset or empty keys take their defaults;
    /// malformed values are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let pagination = PaginationConfig {
            default_per_page: parse(&get, "PAGINATION_DEFAULT_PER_PAGE", 20)?,
            max_per_page: parse(&get, "PAGINATION_MAX_PER_PAGE", 100)?,
        };
        if pagination.max_per_page == 0 {
            return Err(ConfigError::Invalid {
                key: "PAGINATION_MAX_PER_PAGE",
                reason: "must be at least 1".into(),
            });
        }

        Ok(Config {
            database_url: get("DATABASE_URL")
                .unwrap_or_else(|| "postgres://localhost/build_tracker".into()),
            api_host: get("API_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            api_port: parse(&get, "API_PORT", 3000)?,
            enforce_headers: parse_bool(&get, "ENFORCE_HEADERS", true)?,
            shutdown_timeout: Duration::from_secs(parse(&get, "SHUTDOWN_TIMEOUT_SECS", 20)?),
            db_max_open_conns: parse(&get, "DB_MAX_OPEN_CONNS", 10)?,
            db_min_conns: parse(&get, "DB_MIN_CONNS", 2)?,
            tran_lock_timeout: Duration::from_millis(parse(&get, "TRAN_LOCK_TIMEOUT_MS", 5000)?),
            status_check_timeout: Duration::from_secs(parse(&get, "STATUS_CHECK_TIMEOUT_SECS", 5)?),
            pagination,
            max_body_bytes: parse(&get, "MAX_BODY_BYTES", 1024 * 1024)?,
            app_version: get("APP_VERSION").unwrap_or_else(|| env!("CARGO_PKG_VERSION").into()),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}

fn parse<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(v) => v.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: format!("{v:?}: {e}"),
        }),
    }
}

fn parse_bool<G>(get: &G, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key).map(|v| v.to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                key,
                reason: format!("{v:?} is not a boolean"),
            }),
        },
    }
}
