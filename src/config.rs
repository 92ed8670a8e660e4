use std::env;
use std::time::Duration;

use crate::error::DashError;

/// Connection and cache settings, read from the environment (a local
/// `.env` file is honored via dotenvy).
///
/// The database host/port must point at the local listener of the
/// externally managed SSH tunnel; the tunnel itself is not this crate's
/// concern.
#[derive(Debug, Clone)]
pub struct DashConfig {
    pub db_host: String,
    pub db_port: u16,
    pub db_name: String,
    pub db_user: String,
    pub db_password: String,
    /// How long a cached query result stays fresh.
    pub cache_ttl: Duration,
}

const DEFAULT_CACHE_TTL_SECS: u64 = 600;

impl DashConfig {
    pub fn from_env() -> Result<Self, DashError> {
        // Missing .env is fine; real environment variables still apply.
        let _ = dotenvy::dotenv();

        Ok(Self {
            db_host: env::var("DASH_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            db_port: optional_parsed("DASH_DB_PORT")?.unwrap_or(5432),
            db_name: required("DASH_DB_NAME")?,
            db_user: required("DASH_DB_USER")?,
            db_password: required("DASH_DB_PASSWORD")?,
            cache_ttl: Duration::from_secs(
                optional_parsed("DASH_CACHE_TTL_SECS")?.unwrap_or(DEFAULT_CACHE_TTL_SECS),
            ),
        })
    }
}

fn required(key: &str) -> Result<String, DashError> {
    env::var(key).map_err(|_| DashError::Config(format!("missing environment variable {key}")))
}

fn optional_parsed<T: std::str::FromStr>(key: &str) -> Result<Option<T>, DashError> {
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| DashError::Config(format!("invalid value for {key}: {raw:?}"))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_required_variable_is_a_config_error() {
        // DASH_DB_NAME is never set in the test environment.
        std::env::remove_var("DASH_DB_NAME");
        let err = DashConfig::from_env().unwrap_err();
        assert!(matches!(err, DashError::Config(_)));
    }
}
