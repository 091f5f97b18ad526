/// Configuration management for matching-service
///
/// Loads configuration from environment variables. Unparseable numbers fall
/// back to their defaults; missing required values fail startup.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub geocoder: GeocoderConfig,
    pub scorer: ScorerConfig,
    pub dispatch: DispatchSettings,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// HTTP port
    pub http_port: u16,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.env.eq_ignore_ascii_case("production")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 shared secret for bearer tokens
    #[serde(skip_serializing)]
    pub jwt_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocoderConfig {
    pub base_url: String,
    /// Minimum spacing between two lookups
    pub min_interval_ms: u64,
    pub timeout_secs: u64,
}

impl GeocoderConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScorerConfig {
    pub url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchSettings {
    pub poll_interval_secs: u64,
    pub batch_size: i64,
    pub max_attempts: i32,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

/// Like `env_parse`, but values below `min` also fall back to `default`.
fn env_parse_at_least<T: FromStr + PartialOrd>(key: &str, min: T, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .filter(|value| *value >= min)
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let app = AppConfig {
            env: env_or("APP_ENV", "development"),
            host: env_or("APP_HOST", "0.0.0.0"),
            http_port: env_parse("PORT", 8080),
        };

        let database = DatabaseConfig {
            url: std::env::var("DATABASE_URL")
                .context("DATABASE_URL environment variable not set")?,
            max_connections: env_parse("DB_MAX_CONNECTIONS", 20),
            min_connections: env_parse("DB_MIN_CONNECTIONS", 2),
        };

        let auth = AuthConfig {
            jwt_secret: std::env::var("JWT_SECRET")
                .context("JWT_SECRET environment variable not set")?,
        };

        let geocoder = GeocoderConfig {
            base_url: env_or("GEOCODER_BASE_URL", "https://api.postcodes.io"),
            min_interval_ms: env_parse("GEOCODER_MIN_INTERVAL_MS", 150),
            timeout_secs: env_parse("GEOCODER_TIMEOUT_SECS", 10),
        };

        let scorer = ScorerConfig {
            url: env_or("MATCH_SCORER_URL", "http://localhost:8090"),
            timeout_secs: env_parse("MATCH_SCORER_TIMEOUT_SECS", 60),
        };

        let dispatch = DispatchSettings {
            poll_interval_secs: env_parse_at_least("DISPATCH_POLL_INTERVAL_SECS", 1, 5),
            batch_size: env_parse_at_least("DISPATCH_BATCH_SIZE", 1, 50),
            max_attempts: env_parse("DISPATCH_MAX_ATTEMPTS", 5),
        };

        Ok(Config {
            app,
            database,
            auth,
            geocoder,
            scorer,
            dispatch,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test so env mutations never race with each other.
    #[test]
    fn test_from_env_defaults_and_required_values() {
        for key in [
            "PORT",
            "GEOCODER_MIN_INTERVAL_MS",
            "DISPATCH_BATCH_SIZE",
            "DISPATCH_POLL_INTERVAL_SECS",
            "APP_ENV",
        ] {
            std::env::remove_var(key);
        }
        std::env::remove_var("DATABASE_URL");
        std::env::set_var("JWT_SECRET", "test-secret");
        assert!(Config::from_env().is_err());

        std::env::set_var("DATABASE_URL", "postgres://localhost/matching");
        std::env::set_var("DISPATCH_BATCH_SIZE", "not-a-number");
        let config = Config::from_env().unwrap();

        assert_eq!(config.app.http_port, 8080);
        assert!(!config.app.is_production());
        assert_eq!(config.geocoder.min_interval(), Duration::from_millis(150));
        assert_eq!(config.dispatch.batch_size, 50);
        assert_eq!(config.dispatch.max_attempts, 5);
        assert_eq!(config.scorer.url, "http://localhost:8090");

        // Zero or negative dispatch sizing would stall or spin the processor.
        std::env::set_var("DISPATCH_BATCH_SIZE", "0");
        std::env::set_var("DISPATCH_POLL_INTERVAL_SECS", "0");
        let config = Config::from_env().unwrap();
        assert_eq!(config.dispatch.batch_size, 50);
        assert_eq!(config.dispatch.poll_interval_secs, 5);

        std::env::set_var("DISPATCH_BATCH_SIZE", "-4");
        std::env::set_var("DISPATCH_POLL_INTERVAL_SECS", "30");
        let config = Config::from_env().unwrap();
        assert_eq!(config.dispatch.batch_size, 50);
        assert_eq!(config.dispatch.poll_interval_secs, 30);

        std::env::set_var("DISPATCH_BATCH_SIZE", "1");
        assert_eq!(Config::from_env().unwrap().dispatch.batch_size, 1);

        std::env::remove_var("DISPATCH_BATCH_SIZE");
        std::env::remove_var("DISPATCH_POLL_INTERVAL_SECS");
    }
}
