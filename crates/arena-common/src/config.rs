//! Application configuration
//!
//! Loaded from environment variables (with `.env` support via dotenvy).

use serde::Deserialize;
use std::env;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub gateway: GatewayConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub presence: PresenceConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
    /// Identifies this server process in broadcasts and session metadata.
    /// Each process of a horizontally scaled deployment gets its own.
    #[serde(default = "default_instance_id")]
    pub instance_id: String,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Gateway server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

impl GatewayConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_db_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_db_min_connections")]
    pub min_connections: u32,
}

/// Redis configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_redis_max_connections")]
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry: i64,
}

/// Presence tunables (all durations in seconds)
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PresenceConfig {
    /// TTL of the presence record while the user is online
    #[serde(default = "default_online_ttl")]
    pub online_ttl: u64,
    /// TTL of the presence record while away/offline
    #[serde(default = "default_idle_ttl")]
    pub idle_ttl: u64,
    /// TTL of a session hash; refreshed on activity
    #[serde(default = "default_session_ttl")]
    pub session_ttl: u64,
    /// TTL of the heartbeat key; clients must beat at under half this
    #[serde(default = "default_heartbeat_ttl")]
    pub heartbeat_ttl: u64,
    /// TTL of a typing indicator key
    #[serde(default = "default_typing_ttl")]
    pub typing_ttl: u64,
    /// A session whose last activity is older than this is force-deregistered
    #[serde(default = "default_zombie_after")]
    pub zombie_after: u64,
    /// Interval between reconciliation sweeps
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval: u64,
    /// Grace window before a last-session disconnect reads as offline.
    /// Zero means the downgrade is immediate.
    #[serde(default)]
    pub offline_grace: u64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            online_ttl: default_online_ttl(),
            idle_ttl: default_idle_ttl(),
            session_ttl: default_session_ttl(),
            heartbeat_ttl: default_heartbeat_ttl(),
            typing_ttl: default_typing_ttl(),
            zombie_after: default_zombie_after(),
            sweep_interval: default_sweep_interval(),
            offline_grace: 0,
        }
    }
}

// Default value functions
fn default_app_name() -> String {
    "arena-chat".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_instance_id() -> String {
    "single".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_db_max_connections() -> u32 {
    20
}

fn default_db_min_connections() -> u32 {
    5
}

fn default_redis_max_connections() -> u32 {
    16
}

fn default_access_token_expiry() -> i64 {
    900 // 15 minutes
}

fn default_online_ttl() -> u64 {
    300
}

fn default_idle_ttl() -> u64 {
    86_400
}

fn default_session_ttl() -> u64 {
    86_400
}

fn default_heartbeat_ttl() -> u64 {
    120
}

fn default_typing_ttl() -> u64 {
    3
}

fn default_zombie_after() -> u64 {
    1_800 // 30 minutes
}

fn default_sweep_interval() -> u64 {
    60
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            app: AppSettings {
                name: env::var("APP_NAME").unwrap_or_else(|_| default_app_name()),
                env: env::var("APP_ENV")
                    .ok()
                    .and_then(|s| match s.to_lowercase().as_str() {
                        "production" => Some(Environment::Production),
                        "development" => Some(Environment::Development),
                        _ => None,
                    })
                    .unwrap_or_default(),
                instance_id: env::var("INSTANCE_ID").unwrap_or_else(|_| default_instance_id()),
            },
            gateway: GatewayConfig {
                host: env::var("GATEWAY_HOST").unwrap_or_else(|_| default_host()),
                port: env::var("GATEWAY_PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .ok_or(ConfigError::MissingVar("GATEWAY_PORT"))?,
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .map_err(|_| ConfigError::MissingVar("DATABASE_URL"))?,
                max_connections: env_parse("DATABASE_MAX_CONNECTIONS", default_db_max_connections()),
                min_connections: env_parse("DATABASE_MIN_CONNECTIONS", default_db_min_connections()),
            },
            redis: RedisConfig {
                url: env::var("REDIS_URL").map_err(|_| ConfigError::MissingVar("REDIS_URL"))?,
                max_connections: env_parse("REDIS_MAX_CONNECTIONS", default_redis_max_connections()),
            },
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET").map_err(|_| ConfigError::MissingVar("JWT_SECRET"))?,
                access_token_expiry: env_parse(
                    "JWT_ACCESS_TOKEN_EXPIRY",
                    default_access_token_expiry(),
                ),
            },
            presence: PresenceConfig {
                online_ttl: env_parse("PRESENCE_ONLINE_TTL", default_online_ttl()),
                idle_ttl: env_parse("PRESENCE_IDLE_TTL", default_idle_ttl()),
                session_ttl: env_parse("PRESENCE_SESSION_TTL", default_session_ttl()),
                heartbeat_ttl: env_parse("PRESENCE_HEARTBEAT_TTL", default_heartbeat_ttl()),
                typing_ttl: env_parse("PRESENCE_TYPING_TTL", default_typing_ttl()),
                zombie_after: env_parse("PRESENCE_ZOMBIE_AFTER", default_zombie_after()),
                sweep_interval: env_parse("PRESENCE_SWEEP_INTERVAL", default_sweep_interval()),
                offline_grace: env_parse("PRESENCE_OFFLINE_GRACE", 0),
            },
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_is_production() {
        assert!(!Environment::Development.is_production());
        assert!(Environment::Production.is_production());
    }

    #[test]
    fn test_gateway_address() {
        let config = GatewayConfig {
            host: "0.0.0.0".to_string(),
            port: 8081,
        };
        assert_eq!(config.address(), "0.0.0.0:8081");
    }

    #[test]
    fn test_presence_defaults() {
        let presence = PresenceConfig::default();
        assert_eq!(presence.online_ttl, 300);
        assert_eq!(presence.idle_ttl, 86_400);
        assert_eq!(presence.session_ttl, 86_400);
        assert_eq!(presence.heartbeat_ttl, 120);
        assert_eq!(presence.typing_ttl, 3);
        assert_eq!(presence.zombie_after, 1_800);
        assert_eq!(presence.sweep_interval, 60);
        assert_eq!(presence.offline_grace, 0);
    }

    #[test]
    fn test_default_values() {
        assert_eq!(default_app_name(), "arena-chat");
        assert_eq!(default_instance_id(), "single");
        assert_eq!(default_host(), "127.0.0.1");
        assert_eq!(default_access_token_expiry(), 900);
    }
}
