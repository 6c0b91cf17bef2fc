//! Configuration loading from environment.

use std::env;

use payment_store::RedisEndpoint;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub broker_host: String,
    pub consumer_group: String,
    pub redis_host: String,
    pub redis_port: u16,
    pub redis_password: String,
    pub redis_db: u32,
    pub log_format: LogFormat,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| anyhow::anyhow!("{key} environment variable is required"))
        };

        let port = lookup("PORT")
            .unwrap_or_else(|| "8000".to_string())
            .parse()
            .map_err(|e| anyhow::anyhow!("PORT is not a valid port: {e}"))?;

        let redis_port = required("REDIS_PORT")?
            .parse()
            .map_err(|e| anyhow::anyhow!("REDIS_PORT is not a valid port: {e}"))?;

        let redis_db = required("REDIS_DB")?
            .parse()
            .map_err(|e| anyhow::anyhow!("REDIS_DB is not a valid database index: {e}"))?;

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => anyhow::bail!("LOG_FORMAT must be 'pretty' or 'json', got '{other}'"),
        };

        Ok(Self {
            port,
            broker_host: required("BROKER_HOST")?,
            consumer_group: lookup("BROKER_CONSUMER_GROUP")
                .unwrap_or_else(|| "payment-service".to_string()),
            redis_host: required("REDIS_HOST")?,
            redis_port,
            redis_password: required("REDIS_PASSWORD")?,
            redis_db,
            log_format,
        })
    }

    /// Where the Redis store lives. The password is passed through as is.
    pub fn redis_endpoint(&self) -> RedisEndpoint {
        RedisEndpoint {
            host: self.redis_host.clone(),
            port: self.redis_port,
            password: Some(self.redis_password.clone()),
            db: i64::from(self.redis_db),
        }
    }
}
