use serde::{Deserialize, Serialize};
use std::env;

/// Application configuration, loaded once at startup and injected through
/// `AppState`. There is deliberately no process-global config handle; every
/// consumer receives a reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Fixed page size for idea listings.
    pub ideas_per_page: i64,
    /// Directory that uploaded avatar files live in.
    pub avatar_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Signing key for bearer tokens. Required; startup fails without it.
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    /// Users holding this role bypass every ownership predicate.
    pub admin_role_id: i64,
    /// bcrypt work factor for newly hashed passwords.
    pub bcrypt_cost: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {0}")]
    Missing(&'static str),
}

impl AppConfig {
    /// Build configuration from the environment. The JWT signing secret is
    /// the only hard requirement; everything else has a sensible default
    /// with an env override.
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            _ => Environment::Development,
        };

        let jwt_secret = env::var("ACCESS_TOKEN_SECRET")
            .map_err(|_| ConfigError::Missing("ACCESS_TOKEN_SECRET"))?;

        Ok(Self {
            environment,
            api: ApiConfig {
                ideas_per_page: env_parse("IDEAS_PER_PAGE", 20),
                avatar_dir: env::var("AVATAR_DIR").unwrap_or_else(|_| "uploads".to_string()),
            },
            security: SecurityConfig {
                jwt_secret,
                jwt_expiry_hours: env_parse("JWT_EXPIRY_HOURS", 24),
                admin_role_id: env_parse("ADMIN_ROLE_ID", 1),
                bcrypt_cost: env_parse("BCRYPT_COST", 10),
            },
        })
    }

    /// Fixed configuration for tests: known secret, low bcrypt cost so
    /// hashing does not dominate test time.
    pub fn for_tests() -> Self {
        Self {
            environment: Environment::Development,
            api: ApiConfig {
                ideas_per_page: 20,
                avatar_dir: "uploads".to_string(),
            },
            security: SecurityConfig {
                jwt_secret: "test-secret".to_string(),
                jwt_expiry_hours: 24,
                admin_role_id: 1,
                bcrypt_cost: 4,
            },
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_has_admin_role_and_page_size() {
        let config = AppConfig::for_tests();
        assert_eq!(config.security.admin_role_id, 1);
        assert_eq!(config.api.ideas_per_page, 20);
        assert!(!config.security.jwt_secret.is_empty());
    }
}
