//! Application configuration loaded from environment variables.

use std::env;
use std::time::Duration;

use quill_infra::{DatabaseConfig, JwtConfig};

#[cfg(feature = "redis")]
use quill_infra::RedisConfig;

const DEFAULT_LIST_CACHE_TTL_SECS: u64 = 900;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// `None` runs the server on the in-memory store.
    pub database: Option<DatabaseConfig>,
    #[cfg(feature = "redis")]
    pub redis: Option<RedisConfig>,
    pub jwt: JwtConfig,
    /// How long a post listing is served from cache.
    pub list_cache_ttl: Duration,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let development = env::var("RUST_ENV")
            .map(|v| v == "development" || v == "dev")
            .unwrap_or(false);

        let database = env::var("DATABASE_URL").ok().map(|url| {
            let mut config = DatabaseConfig::new(url);
            config.max_connections =
                parse_var("DB_MAX_CONNECTIONS").unwrap_or(config.max_connections);
            config.min_connections =
                parse_var("DB_MIN_CONNECTIONS").unwrap_or(config.min_connections);
            config.sqlx_logging = development;
            config
        });

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_var("PORT").unwrap_or(8080),
            database,
            #[cfg(feature = "redis")]
            redis: RedisConfig::from_env(),
            jwt: JwtConfig::from_env(),
            list_cache_ttl: Duration::from_secs(
                parse_var("LIST_CACHE_TTL_SECS").unwrap_or(DEFAULT_LIST_CACHE_TTL_SECS),
            ),
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.parse().ok())
}
