use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub max_pool_size: u32,
    pub pool_acquire_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let jwt_secret = lookup("JWT_SECRET")
            .filter(|secret| !secret.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let jwt_expiration_hours: i64 = var("JWT_EXPIRATION_HOURS", "24")
            .parse()
            .map_err(|_| ConfigError::Invalid("JWT_EXPIRATION_HOURS"))?;
        if jwt_expiration_hours <= 0 {
            return Err(ConfigError::Invalid("JWT_EXPIRATION_HOURS"));
        }

        Ok(Self {
            server_host: var("SERVER_HOST", "0.0.0.0"),
            server_port: var("SERVER_PORT", "8080")
                .parse()
                .map_err(|_| ConfigError::Invalid("SERVER_PORT"))?,
            database_url: var("DATABASE_URL", "sqlite://dbe_tracker.db"),
            jwt_secret,
            jwt_expiration_hours,
            max_pool_size: var("MAX_POOL_SIZE", "5")
                .parse()
                .map_err(|_| ConfigError::Invalid("MAX_POOL_SIZE"))?,
            pool_acquire_timeout: Duration::from_secs(
                var("POOL_ACQUIRE_TIMEOUT_SECS", "3")
                    .parse()
                    .map_err(|_| ConfigError::Invalid("POOL_ACQUIRE_TIMEOUT_SECS"))?,
            ),
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{0} has an invalid value")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let config = Config::from_lookup(lookup(&[("JWT_SECRET", "s3cret")])).unwrap();
        assert_eq!(config.server_addr(), "0.0.0.0:8080");
        assert_eq!(config.database_url, "sqlite://dbe_tracker.db");
        assert_eq!(config.jwt_expiration_hours, 24);
        assert_eq!(config.max_pool_size, 5);
        assert_eq!(config.pool_acquire_timeout, Duration::from_secs(3));
    }

    #[test]
    fn missing_secret_is_an_error() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_SECRET")));
    }

    #[test]
    fn bad_port_is_an_error() {
        let err = Config::from_lookup(lookup(&[("JWT_SECRET", "x"), ("SERVER_PORT", "http")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("SERVER_PORT")));
    }
}
