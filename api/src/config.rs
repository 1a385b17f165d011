//! Process configuration, read once at startup.

use std::env;
use std::net::SocketAddr;

use chrono::Duration;

use crate::auth::session::SessionSettings;

const MIN_SECRET_LEN: usize = 32;
const MAX_TTL_DAYS: i64 = 365;
const MAX_RATE_WINDOW_DAYS: i64 = 1;

/// Everything the server needs to boot.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub db_max_connections: u32,
    pub session: SessionSettings,
    /// Attempts allowed per client on the register/login endpoints.
    pub auth_rate_limit: u32,
    pub auth_rate_window: Duration,
    /// Key rate limits on `X-Forwarded-For`. Only safe behind a proxy that
    /// overwrites the header.
    pub trust_proxy: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. `from_env` is the
    /// production entry point; tests feed a map through here.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let secret = lookup("SESSION_SECRET").ok_or(ConfigError::Missing("SESSION_SECRET"))?;
        if secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::Invalid(
                "SESSION_SECRET must be at least 32 characters",
            ));
        }

        let bind_addr = parse_or(&lookup, "BIND_ADDR", "0.0.0.0:3000")?;
        let db_max_connections = parse_or(&lookup, "DB_MAX_CONNECTIONS", "5")?;
        let ttl_minutes: i64 = parse_or(&lookup, "SESSION_TTL_MINUTES", "60")?;
        let refresh_minutes: i64 = parse_or(&lookup, "SESSION_REFRESH_WINDOW_MINUTES", "30")?;
        let cookie_secure = parse_or(&lookup, "COOKIE_SECURE", "true")?;
        let auth_rate_limit = parse_or(&lookup, "AUTH_RATE_LIMIT", "10")?;
        let window_secs: i64 = parse_or(&lookup, "AUTH_RATE_WINDOW_SECS", "60")?;
        let trust_proxy = parse_or(&lookup, "TRUST_PROXY", "false")?;

        if ttl_minutes <= 0 {
            return Err(ConfigError::Invalid("SESSION_TTL_MINUTES"));
        }
        if refresh_minutes < 0 || refresh_minutes > ttl_minutes {
            return Err(ConfigError::Invalid("SESSION_REFRESH_WINDOW_MINUTES"));
        }
        if window_secs <= 0 {
            return Err(ConfigError::Invalid("AUTH_RATE_WINDOW_SECS"));
        }

        // `now + duration` must stay representable for tokens and rate windows.
        let ttl = Duration::try_minutes(ttl_minutes)
            .filter(|ttl| *ttl <= Duration::days(MAX_TTL_DAYS))
            .ok_or(ConfigError::Invalid("SESSION_TTL_MINUTES"))?;
        let refresh_window = Duration::try_minutes(refresh_minutes)
            .ok_or(ConfigError::Invalid("SESSION_REFRESH_WINDOW_MINUTES"))?;
        let auth_rate_window = Duration::try_seconds(window_secs)
            .filter(|window| *window <= Duration::days(MAX_RATE_WINDOW_DAYS))
            .ok_or(ConfigError::Invalid("AUTH_RATE_WINDOW_SECS"))?;

        Ok(Self {
            bind_addr,
            database_url,
            db_max_connections,
            session: SessionSettings {
                secret,
                ttl,
                refresh_window,
                cookie_secure,
            },
            auth_rate_limit,
            auth_rate_window,
            trust_proxy,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .unwrap_or_else(|| default.to_owned())
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(key))
}

/// Configuration error
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
