use crate::services::OwnershipPolicy;
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct TransferConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub storage: StorageBackend,
    pub database: Option<DatabaseConfig>,
    pub session: SessionConfig,
    pub transfers: TransfersConfig,
    pub security: SecurityConfig,
    pub swagger: SwaggerConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub token_ttl_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransfersConfig {
    /// Prefix of the confirmation URL handed back by `/send`.
    pub public_base_url: String,
    pub ownership: OwnershipPolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SwaggerConfig {
    pub enabled: SwaggerMode,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SwaggerMode {
    Public,
    Disabled,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub login_attempts: u32,
    pub login_window_seconds: u64,
    pub register_attempts: u32,
    pub register_window_seconds: u64,
}

impl TransferConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let storage: StorageBackend = get_env("STORAGE_BACKEND", Some("postgres"), is_prod)?
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let database = match storage {
            StorageBackend::Postgres => Some(DatabaseConfig {
                url: get_env("DATABASE_URL", None, is_prod)?,
                max_connections: get_env("DATABASE_MAX_CONNECTIONS", Some("10"), is_prod)?
                    .parse()
                    .unwrap_or(10),
                min_connections: get_env("DATABASE_MIN_CONNECTIONS", Some("1"), is_prod)?
                    .parse()
                    .unwrap_or(1),
            }),
            StorageBackend::Memory => None,
        };

        let default_base_url = format!("http://localhost:{}", common_config.port);

        let config = TransferConfig {
            environment: environment.clone(),
            service_name: get_env("SERVICE_NAME", Some("transfer-service"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            storage,
            database,
            session: SessionConfig {
                token_ttl_hours: get_env("SESSION_TOKEN_TTL_HOURS", Some("24"), is_prod)?
                    .parse()
                    .map_err(|e: std::num::ParseIntError| {
                        AppError::ConfigError(anyhow::anyhow!(e.to_string()))
                    })?,
            },
            transfers: TransfersConfig {
                public_base_url: get_env("PUBLIC_BASE_URL", Some(default_base_url.as_str()), is_prod)?
                    .trim_end_matches('/')
                    .to_string(),
                ownership: get_env("ENFORCE_ITEM_OWNERSHIP", Some("true"), is_prod)?
                    .parse()
                    .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?,
            },
            security: SecurityConfig {
                allowed_origins: get_env(
                    "ALLOWED_ORIGINS",
                    Some("http://localhost:3000"),
                    is_prod,
                )?
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            },
            swagger: SwaggerConfig {
                enabled: get_env("ENABLE_SWAGGER", Some("public"), is_prod)?
                    .parse()
                    .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?,
            },
            rate_limit: RateLimitConfig {
                login_attempts: get_env("RATE_LIMIT_LOGIN_ATTEMPTS", Some("5"), is_prod)?
                    .parse()
                    .unwrap_or(5),
                login_window_seconds: get_env(
                    "RATE_LIMIT_LOGIN_WINDOW_SECONDS",
                    Some("60"),
                    is_prod,
                )?
                .parse()
                .unwrap_or(60),
                register_attempts: get_env("RATE_LIMIT_REGISTER_ATTEMPTS", Some("3"), is_prod)?
                    .parse()
                    .unwrap_or(3),
                register_window_seconds: get_env(
                    "RATE_LIMIT_REGISTER_WINDOW_SECONDS",
                    Some("60"),
                    is_prod,
                )?
                .parse()
                .unwrap_or(60),
            },
            common: common_config,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        if self.session.token_ttl_hours <= 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "SESSION_TOKEN_TTL_HOURS must be positive"
            )));
        }

        if self.storage == StorageBackend::Postgres
            && self.database.as_ref().map_or(true, |db| db.url.is_empty())
        {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "DATABASE_URL is required for the postgres storage backend"
            )));
        }

        if self.environment == Environment::Prod {
            if self.security.allowed_origins.iter().any(|o| o == "*") {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "Wildcard CORS origin not allowed in production"
                )));
            }

            if self.storage == StorageBackend::Memory {
                tracing::warn!("In-memory storage in production; all state is lost on restart");
            }
        }

        Ok(())
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session.token_ttl_hours)
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            _ => Err(format!("Invalid storage backend: {}", s)),
        }
    }
}

impl std::str::FromStr for SwaggerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "public" => Ok(SwaggerMode::Public),
            "disabled" => Ok(SwaggerMode::Disabled),
            _ => Err(format!("Invalid swagger mode: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_config() -> TransferConfig {
        TransferConfig {
            common: core_config::Config::default(),
            environment: Environment::Dev,
            service_name: "transfer-service".to_string(),
            service_version: "test".to_string(),
            log_level: "info".to_string(),
            otlp_endpoint: None,
            storage: StorageBackend::Memory,
            database: None,
            session: SessionConfig { token_ttl_hours: 24 },
            transfers: TransfersConfig {
                public_base_url: "http://localhost:8080".to_string(),
                ownership: OwnershipPolicy::Enforced,
            },
            security: SecurityConfig {
                allowed_origins: vec!["http://localhost:3000".to_string()],
            },
            swagger: SwaggerConfig {
                enabled: SwaggerMode::Public,
            },
            rate_limit: RateLimitConfig {
                login_attempts: 5,
                login_window_seconds: 60,
                register_attempts: 3,
                register_window_seconds: 60,
            },
        }
    }

    #[test]
    fn test_parse_enums() {
        assert_eq!("PROD".parse(), Ok(Environment::Prod));
        assert_eq!("memory".parse(), Ok(StorageBackend::Memory));
        assert_eq!("disabled".parse(), Ok(SwaggerMode::Disabled));
        assert!("sqlite".parse::<StorageBackend>().is_err());
        assert!("authenticated".parse::<SwaggerMode>().is_err());
    }

    #[test]
    fn test_validate_accepts_memory_backend() {
        assert!(memory_config().validate().is_ok());
        assert_eq!(memory_config().session_ttl(), chrono::Duration::hours(24));
    }

    #[test]
    fn test_validate_rejects_non_positive_ttl() {
        let mut config = memory_config();
        config.session.token_ttl_hours = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_requires_database_url_for_postgres() {
        let mut config = memory_config();
        config.storage = StorageBackend::Postgres;
        assert!(config.validate().is_err());

        config.database = Some(DatabaseConfig {
            url: "postgres://localhost/transfers".to_string(),
            max_connections: 10,
            min_connections: 1,
        });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_wildcard_origin_in_prod() {
        let mut config = memory_config();
        config.environment = Environment::Prod;
        config.security.allowed_origins = vec!["*".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_get_env_falls_back_outside_prod() {
        let value = get_env("TRANSFER_TEST_SURELY_UNSET", Some("fallback"), false).unwrap();
        assert_eq!(value, "fallback");
        assert!(get_env("TRANSFER_TEST_SURELY_UNSET", Some("fallback"), true).is_err());
    }
}
