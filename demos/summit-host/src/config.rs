//! Host settings read from the environment.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use summit::prelude::MatchConfig;

/// Settings for one host process.
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Listen address. `PORT` wins over `SUMMIT_ADDR`.
    pub addr: SocketAddr,
    /// Fallback log filter when `RUST_LOG` is unset.
    pub log_filter: String,
    /// How often the host logs occupancy. Zero disables it.
    pub status_interval: Duration,
    pub match_config: MatchConfig,
}

impl HostConfig {
    /// Loads settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads settings through `lookup`, which returns a variable's value
    /// if it is set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{port}"),
            None => lookup("SUMMIT_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
        };
        let addr = addr.parse().map_err(|_| ConfigError::InvalidAddress(addr))?;

        let defaults = MatchConfig::default();
        let match_config = MatchConfig {
            capacity: parse_or(&lookup, "SUMMIT_CAPACITY", defaults.capacity)?,
            countdown_time: parse_or(&lookup, "SUMMIT_COUNTDOWN_SECS", defaults.countdown_time)?,
            prepare_time: parse_or(&lookup, "SUMMIT_PREPARE_SECS", defaults.prepare_time)?,
            ready_up_time: parse_or(&lookup, "SUMMIT_READY_UP_SECS", defaults.ready_up_time)?,
            end_grace: Duration::from_secs(parse_or(
                &lookup,
                "SUMMIT_END_GRACE_SECS",
                defaults.end_grace.as_secs(),
            )?),
            ..defaults
        };

        Ok(Self {
            addr,
            log_filter: lookup("SUMMIT_LOG").unwrap_or_else(|| "info".to_string()),
            status_interval: Duration::from_secs(parse_or(&lookup, "SUMMIT_STATUS_SECS", 30)?),
            match_config,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid listen address: {0}")]
    InvalidAddress(String),

    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = HostConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.addr.to_string(), "0.0.0.0:3000");
        assert_eq!(config.log_filter, "info");
        assert_eq!(config.match_config.capacity, 3);
        assert_eq!(config.match_config.end_grace, Duration::from_secs(30));
    }

    #[test]
    fn test_port_overrides_addr() {
        let vars = [("PORT", "9000"), ("SUMMIT_ADDR", "127.0.0.1:1")];
        let config = HostConfig::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.addr.to_string(), "0.0.0.0:9000");
    }

    #[test]
    fn test_match_tunables() {
        let config = HostConfig::from_lookup(lookup(&[
            ("SUMMIT_CAPACITY", "4"),
            ("SUMMIT_COUNTDOWN_SECS", " 6 "),
            ("SUMMIT_END_GRACE_SECS", "2"),
        ]))
        .unwrap();
        assert_eq!(config.match_config.capacity, 4);
        assert_eq!(config.match_config.countdown_time, 6);
        assert_eq!(config.match_config.end_grace, Duration::from_secs(2));
        assert_eq!(config.match_config.countdown_start(), 12);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = HostConfig::from_lookup(lookup(&[("SUMMIT_CAPACITY", "three")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "SUMMIT_CAPACITY", .. }));

        let err = HostConfig::from_lookup(lookup(&[("SUMMIT_ADDR", "nowhere")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidAddress(_)));
    }
}
