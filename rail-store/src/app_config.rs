use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    pub database: DatabaseConfig,
    /// Rate limiting is enabled only when Redis is configured.
    #[serde(default)]
    pub redis: Option<RedisConfig>,
    pub auth: AuthConfig,
    /// Without SMTP settings notifications are only logged.
    #[serde(default)]
    pub email: Option<EmailConfig>,
    #[serde(default)]
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    #[serde(default = "default_max_passengers")]
    pub max_passengers_per_booking: usize,
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: i64,
    #[serde(default = "default_pnr_attempts")]
    pub pnr_attempts: u32,
}

fn default_max_passengers() -> usize { 6 }
fn default_rate_limit() -> i64 { 100 }
fn default_pnr_attempts() -> u32 { 5 }

impl Default for BusinessRules {
    fn default() -> Self {
        Self {
            max_passengers_per_booking: default_max_passengers(),
            rate_limit_per_minute: default_rate_limit(),
            pnr_attempts: default_pnr_attempts(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    Memory,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 { 5 }

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmailConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub username: String,
    pub password: String,
    #[serde(default = "default_from_name")]
    pub from_name: String,
    /// Defaults to `username`.
    #[serde(default)]
    pub from_address: Option<String>,
}

fn default_smtp_port() -> u16 { 587 }
fn default_from_name() -> String { "RailReserve".into() }

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Optional per-environment overrides
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `RAIL__DATABASE__URL=postgres://...`
            .add_source(config::Environment::with_prefix("RAIL").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    pub fn from_toml_str(toml: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_fills_defaults() {
        let cfg = Config::from_toml_str(
            r#"
            [server]
            port = 5000

            [database]
            url = "postgres://localhost/rail"

            [auth]
            jwt_secret = "secret"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.storage.backend, StorageBackend::Postgres);
        assert!(cfg.redis.is_none());
        assert!(cfg.email.is_none());
        assert_eq!(cfg.business_rules.max_passengers_per_booking, 6);
        assert_eq!(cfg.business_rules.pnr_attempts, 5);
        assert_eq!(cfg.database.max_connections, 5);
    }

    #[test]
    fn test_memory_backend_and_email() {
        let cfg = Config::from_toml_str(
            r#"
            [server]
            port = 8080

            [storage]
            backend = "memory"

            [database]
            url = ""

            [auth]
            jwt_secret = "secret"

            [email]
            host = "smtp.example.com"
            username = "trains@example.com"
            password = "pw"

            [business_rules]
            max_passengers_per_booking = 4
            "#,
        )
        .unwrap();

        assert_eq!(cfg.storage.backend, StorageBackend::Memory);
        let email = cfg.email.unwrap();
        assert_eq!(email.port, 587);
        assert_eq!(email.from_name, "RailReserve");
        assert_eq!(cfg.business_rules.max_passengers_per_booking, 4);
        assert_eq!(cfg.business_rules.rate_limit_per_minute, 100);
    }
}
