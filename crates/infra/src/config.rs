//! Configuration loading and representation.
//!
//! Everything comes from environment variables; unset variables fall back to
//! defaults suitable for local development (in-memory store, port 8080).

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use scheduler_auth::DEFAULT_IDLE_TIMEOUT;
use scheduler_observability::LogFormat;
use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_SESSION_COOKIE: &str = "SESSION";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(var: &'static str, reason: impl ToString) -> Self {
        Self::Invalid {
            var,
            reason: reason.to_string(),
        }
    }
}

/// Process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Postgres connection string; `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub session_cookie_name: String,
    /// Sessions idle for this long are dropped.
    pub session_idle_timeout: Duration,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            database_url: None,
            database_max_connections: DEFAULT_MAX_CONNECTIONS,
            session_cookie_name: DEFAULT_SESSION_COOKIE.to_string(),
            session_idle_timeout: DEFAULT_IDLE_TIMEOUT,
            log_format: LogFormat::Json,
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars().collect())
    }

    /// Same as [`from_env`](Self::from_env) over an explicit variable map.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::invalid("BIND_ADDR", e))?;

        let database_max_connections = match get("DATABASE_MAX_CONNECTIONS") {
            None => DEFAULT_MAX_CONNECTIONS,
            Some(raw) => match raw.parse::<u32>() {
                Ok(0) => return Err(ConfigError::invalid("DATABASE_MAX_CONNECTIONS", "must be at least 1")),
                Ok(n) => n,
                Err(e) => return Err(ConfigError::invalid("DATABASE_MAX_CONNECTIONS", e)),
            },
        };

        let session_cookie_name = get("SESSION_COOKIE_NAME").unwrap_or_else(|| DEFAULT_SESSION_COOKIE.to_string());
        if !session_cookie_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ConfigError::invalid(
                "SESSION_COOKIE_NAME",
                "only ASCII letters, digits, '_' and '-' are allowed",
            ));
        }

        let session_idle_timeout = match get("SESSION_IDLE_TIMEOUT_SECS") {
            None => DEFAULT_IDLE_TIMEOUT,
            Some(raw) => match raw.parse::<u64>() {
                Ok(0) => return Err(ConfigError::invalid("SESSION_IDLE_TIMEOUT_SECS", "must be at least 1")),
                Ok(secs) => Duration::from_secs(secs),
                Err(e) => return Err(ConfigError::invalid("SESSION_IDLE_TIMEOUT_SECS", e)),
            },
        };

        let log_format = match get("LOG_FORMAT") {
            None => LogFormat::Json,
            Some(raw) => raw.parse().map_err(|e| ConfigError::invalid("LOG_FORMAT", e))?,
        };

        Ok(Self {
            bind_addr,
            database_url: get("DATABASE_URL"),
            database_max_connections,
            session_cookie_name,
            session_idle_timeout,
            log_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        assert_eq!(AppConfig::from_vars(HashMap::new()).unwrap(), AppConfig::default());
    }

    #[test]
    fn reads_all_variables() {
        let config = AppConfig::from_vars(vars(&[
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("DATABASE_URL", "postgres://localhost/board"),
            ("DATABASE_MAX_CONNECTIONS", "12"),
            ("SESSION_COOKIE_NAME", "BOARD_SID"),
            ("SESSION_IDLE_TIMEOUT_SECS", "600"),
            ("LOG_FORMAT", "pretty"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/board"));
        assert_eq!(config.database_max_connections, 12);
        assert_eq!(config.session_cookie_name, "BOARD_SID");
        assert_eq!(config.session_idle_timeout, Duration::from_secs(600));
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn blank_database_url_means_in_memory() {
        let config = AppConfig::from_vars(vars(&[("DATABASE_URL", "  ")])).unwrap();
        assert_eq!(config.database_url, None);
    }

    #[test]
    fn invalid_values_are_rejected() {
        for (var, value) in [
            ("BIND_ADDR", "not-an-addr"),
            ("DATABASE_MAX_CONNECTIONS", "0"),
            ("DATABASE_MAX_CONNECTIONS", "many"),
            ("SESSION_COOKIE_NAME", "bad;name"),
            ("SESSION_IDLE_TIMEOUT_SECS", "0"),
            ("SESSION_IDLE_TIMEOUT_SECS", "soon"),
            ("LOG_FORMAT", "xml"),
        ] {
            let err = AppConfig::from_vars(vars(&[(var, value)])).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { var: v, .. } if v == var), "{var}={value}");
        }
    }
}
