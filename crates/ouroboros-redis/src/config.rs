//! Connection configuration.
//!
//! # Example
//! ```rust,ignore
//! use ouroboros_redis::RedisConfig;
//!
//! // From environment
//! let config = RedisConfig::from_env()?;
//!
//! // Or explicit configuration
//! let config = RedisConfig {
//!     host: "cache.internal".to_string(),
//!     db: 2,
//!     ..Default::default()
//! };
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::StoreError;

/// Redis connection settings
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Server hostname or IP
    pub host: String,
    /// Server port
    pub port: u16,
    /// Logical database index
    pub db: i64,
    /// Optional password, passed through to AUTH untouched
    pub password: Option<String>,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            db: 0,
            password: None,
        }
    }
}

impl fmt::Debug for RedisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("db", &self.db)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl RedisConfig {
    /// Create configuration from environment variables.
    ///
    /// Reads `REDIS_HOST`, `REDIS_PORT`, `REDIS_DB` and `REDIS_PASSWORD`.
    /// Unset variables fall back to the defaults; an empty password counts as unset.
    pub fn from_env() -> Result<Self, StoreError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, StoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let host = lookup("REDIS_HOST").unwrap_or(defaults.host);
        let port = match lookup("REDIS_PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| {
                StoreError::Configuration(format!("Invalid REDIS_PORT '{}': {}", raw, e))
            })?,
            None => defaults.port,
        };
        let db = match lookup("REDIS_DB") {
            Some(raw) => {
                let db = raw.trim().parse::<i64>().map_err(|e| {
                    StoreError::Configuration(format!("Invalid REDIS_DB '{}': {}", raw, e))
                })?;
                if db < 0 {
                    return Err(StoreError::Configuration(format!(
                        "Invalid REDIS_DB '{}': database index cannot be negative",
                        raw
                    )));
                }
                db
            }
            None => defaults.db,
        };
        let password = lookup("REDIS_PASSWORD").filter(|p| !p.is_empty());

        Ok(Self {
            host,
            port,
            db,
            password,
        })
    }

    /// Connection URL in `redis://[:password@]host:port/db` form.
    ///
    /// The password is percent-encoded so reserved characters survive URL parsing.
    pub fn url(&self) -> String {
        match &self.password {
            Some(password) => format!(
                "redis://:{}@{}:{}/{}",
                urlencoding::encode(password),
                self.host,
                self.port,
                self.db
            ),
            None => format!("redis://{}:{}/{}", self.host, self.port, self.db),
        }
    }

    /// `host:port/db`, safe to log
    pub fn endpoint(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_config_defaults() {
        let config = RedisConfig::default();
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 6379);
        assert_eq!(config.db, 0);
        assert!(config.password.is_none());
        assert_eq!(config.url(), "redis://localhost:6379/0");
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = RedisConfig::from_lookup(lookup_from(&[
            ("REDIS_HOST", "10.0.0.5"),
            ("REDIS_PORT", "6380"),
            ("REDIS_DB", "3"),
            ("REDIS_PASSWORD", "s3cret"),
        ]))
        .unwrap();

        assert_eq!(config.host, "10.0.0.5");
        assert_eq!(config.port, 6380);
        assert_eq!(config.db, 3);
        assert_eq!(config.password.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_from_lookup_empty_password_is_none() {
        let config = RedisConfig::from_lookup(lookup_from(&[("REDIS_PASSWORD", "")])).unwrap();
        assert!(config.password.is_none());
    }

    #[test]
    fn test_from_lookup_rejects_bad_numbers() {
        let err = RedisConfig::from_lookup(lookup_from(&[("REDIS_PORT", "abc")])).unwrap_err();
        assert!(matches!(err, StoreError::Configuration(_)));

        let err = RedisConfig::from_lookup(lookup_from(&[("REDIS_DB", "-1")])).unwrap_err();
        assert!(matches!(err, StoreError::Configuration(_)));
    }

    #[test]
    fn test_url_encodes_password() {
        let config = RedisConfig {
            password: Some("p@ss:word/1".to_string()),
            ..Default::default()
        };
        assert_eq!(config.url(), "redis://:p%40ss%3Aword%2F1@localhost:6379/0");
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = RedisConfig {
            password: Some("hunter2".to_string()),
            ..Default::default()
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }
}
