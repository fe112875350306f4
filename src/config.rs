//! Server Configuration
//!
//! Everything the binary needs, read from environment variables. Unset
//! variables take their defaults; malformed ones fail startup.
//!
//! | Variable | Default |
//! |---|---|
//! | `ROWSHIFT_BIND_ADDR` | `0.0.0.0:8000` |
//! | `ROWSHIFT_MAX_CONNECTIONS` | `1000` |
//! | `ROWSHIFT_IDLE_TIMEOUT_SECS` | `300` |
//! | `ROWSHIFT_SHIFT_POLICY` | `conveyor` |
//! | `ROWSHIFT_MAX_DIMENSION` | `64` |
//! | `AUTH_ISSUER`, `AUTH_AUDIENCE` | unset |
//! | `AUTH_PUBLIC_KEY_PEM`, `AUTH_SECRET` | unset (token is the identity) |
//! | `AUTH_SKIP_EXPIRY` | `false` |

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::game::engine::EngineConfig;
use crate::network::auth::AuthConfig;
use crate::network::server::ServerConfig;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A variable is set but cannot be used.
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        /// Variable name.
        key: &'static str,
        /// Value as found.
        value: String,
        /// What is wrong with it.
        reason: String,
    },
}

/// Full server configuration.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Listener and connection settings.
    pub server: ServerConfig,
    /// Game rule settings.
    pub engine: EngineConfig,
    /// Token validation settings.
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`, which maps a variable name to
    /// its value if set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = AppConfig::default();

        let server = ServerConfig {
            bind_addr: parse(&lookup, "ROWSHIFT_BIND_ADDR")?.unwrap_or(defaults.server.bind_addr),
            max_connections: positive(&lookup, "ROWSHIFT_MAX_CONNECTIONS")?
                .unwrap_or(defaults.server.max_connections),
            idle_timeout: positive(&lookup, "ROWSHIFT_IDLE_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.server.idle_timeout),
            ..defaults.server
        };

        let engine = EngineConfig {
            shift_policy: parse(&lookup, "ROWSHIFT_SHIFT_POLICY")?
                .unwrap_or(defaults.engine.shift_policy),
            max_dimension: positive(&lookup, "ROWSHIFT_MAX_DIMENSION")?
                .unwrap_or(defaults.engine.max_dimension),
        };

        let auth = AuthConfig {
            issuer: non_empty(&lookup, "AUTH_ISSUER"),
            audience: non_empty(&lookup, "AUTH_AUDIENCE"),
            public_key_pem: non_empty(&lookup, "AUTH_PUBLIC_KEY_PEM"),
            secret: non_empty(&lookup, "AUTH_SECRET"),
            skip_expiry: flag(&lookup, "AUTH_SKIP_EXPIRY")?,
        };

        Ok(Self { server, engine, auth })
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|v| !v.trim().is_empty())
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    let Some(raw) = non_empty(lookup, key) else {
        return Ok(None);
    };

    raw.trim().parse::<T>().map(Some).map_err(|e: T::Err| ConfigError::InvalidValue {
        key,
        value: raw.clone(),
        reason: e.to_string(),
    })
}

fn positive<T>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr + Default + PartialEq,
    T::Err: Display,
{
    match parse::<T>(lookup, key)? {
        Some(value) if value == T::default() => Err(ConfigError::InvalidValue {
            key,
            value: lookup(key).unwrap_or_default(),
            reason: "must be greater than zero".into(),
        }),
        other => Ok(other),
    }
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<bool, ConfigError> {
    let Some(raw) = non_empty(lookup, key) else {
        return Ok(false);
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: raw,
            reason: "expected true or false".into(),
        }),
    }
}
