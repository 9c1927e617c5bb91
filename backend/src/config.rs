//! Server settings read from the environment
//!
//! Every key is optional and falls back to a default; a key that is present but
//! does not parse is an error rather than a silent fallback.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{key} has invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub http_addr: SocketAddr,
    /// Period of the shared clock sweep
    pub tick_interval: Duration,
    /// Minimum gap between `clock_update` broadcasts for one game
    pub clock_broadcast_interval: Duration,
    pub rating_k_factor: f64,
    /// Largest rating gap the matchmaker will pair
    pub rating_band: i32,
    /// Rating given to newly registered users
    pub default_rating: i32,
    /// How long completed games stay queryable before retirement
    pub completed_retention: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            http_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            tick_interval: Duration::from_millis(100),
            clock_broadcast_interval: Duration::from_millis(1000),
            rating_k_factor: 32.0,
            rating_band: 200,
            default_rating: 1200,
            completed_retention: Duration::from_secs(3600),
        }
    }
}

impl ServerConfig {
    /// Read `CHESS_*` variables from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ServerConfig::from_env`] with an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ServerConfig::default();
        Ok(ServerConfig {
            http_addr: parse_or(&lookup, "CHESS_HTTP_ADDR", defaults.http_addr)?,
            tick_interval: Duration::from_millis(parse_or(
                &lookup,
                "CHESS_TICK_INTERVAL_MS",
                defaults.tick_interval.as_millis() as u64,
            )?),
            clock_broadcast_interval: Duration::from_millis(parse_or(
                &lookup,
                "CHESS_CLOCK_BROADCAST_MS",
                defaults.clock_broadcast_interval.as_millis() as u64,
            )?),
            rating_k_factor: parse_or(&lookup, "CHESS_RATING_K_FACTOR", defaults.rating_k_factor)?,
            rating_band: parse_or(&lookup, "CHESS_RATING_BAND", defaults.rating_band)?,
            default_rating: parse_or(&lookup, "CHESS_DEFAULT_RATING", defaults.default_rating)?,
            completed_retention: Duration::from_secs(parse_or(
                &lookup,
                "CHESS_COMPLETED_RETENTION_SECS",
                defaults.completed_retention.as_secs(),
            )?),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => match value.trim().parse::<T>() {
            Ok(parsed) => Ok(parsed),
            Err(e) => Err(ConfigError::Invalid {
                key,
                reason: e.to_string(),
                value,
            }),
        },
    }
}
