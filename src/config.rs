use std::path::Path;

use rand::Rng;
use thiserror::Error;
use tracing::{info, warn};

const DEFAULT_DATABASE_URL: &str = "sqlite://sql_trainer.db?mode=rwc";
const DEFAULT_SANDBOX_DATABASE_URL: &str = "sqlite://sandbox.db?mode=rwc";
const DEFAULT_TOKEN_TTL_MINUTES: i64 = 30;
const DEFAULT_ADMIN_REGISTRATION_KEY: &str = "admin";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },

    #[error("Failed to load environment file {path}: {source}")]
    EnvFile {
        path: String,
        source: dotenvy::Error,
    },
}

#[derive(Debug, Clone)]
pub struct SeedAdmin {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub sandbox_database_url: String,
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
    pub admin_registration_key: String,
    pub seed_admin: Option<SeedAdmin>,
    pub otlp_endpoint: Option<String>,
    pub honeycomb_api_key: Option<String>,
    pub environment: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = var("ROCKET_PROFILE").unwrap_or_else(|| "development".to_string());
        let is_production = environment == "production";

        let jwt_secret = match var("JWT_SECRET") {
            Some(secret) => secret,
            None if is_production => return Err(ConfigError::Missing("JWT_SECRET")),
            None => {
                warn!("JWT_SECRET not set, tokens will not survive a restart");
                ephemeral_secret()
            }
        };

        let token_ttl_minutes = match var("TOKEN_TTL_MINUTES") {
            Some(value) => match value.parse::<i64>() {
                Ok(minutes) if minutes > 0 => minutes,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "TOKEN_TTL_MINUTES",
                        value,
                    });
                }
            },
            None => DEFAULT_TOKEN_TTL_MINUTES,
        };

        let seed_admin = var("SEED_ADMIN_PASSWORD").map(|password| SeedAdmin {
            username: var("SEED_ADMIN_USERNAME").unwrap_or_else(|| "admin".to_string()),
            email: var("SEED_ADMIN_EMAIL").unwrap_or_else(|| "admin@example.com".to_string()),
            password,
        });

        Ok(Self {
            database_url: var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            sandbox_database_url: var("SANDBOX_DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_SANDBOX_DATABASE_URL.to_string()),
            jwt_secret,
            token_ttl_minutes,
            admin_registration_key: var("ADMIN_REGISTRATION_KEY")
                .unwrap_or_else(|| DEFAULT_ADMIN_REGISTRATION_KEY.to_string()),
            seed_admin,
            otlp_endpoint: var("OTEL_EXPORTER_OTLP_ENDPOINT"),
            honeycomb_api_key: var("HONEYCOMB_API_KEY"),
            environment,
        })
    }
}

// Blank values count as unset.
fn var(key: &str) -> Option<String> {
    dotenvy::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn ephemeral_secret() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

pub fn load_environment() -> Result<(), ConfigError> {
    let is_production =
        dotenvy::var("ROCKET_PROFILE").unwrap_or("development".to_string()) == "production";

    let env_files = if is_production {
        vec!["config/common.env", "config/prod.env", ".secrets.env"]
    } else {
        vec!["config/common.env", "config/dev.env", ".secrets.env"]
    };

    for env_file in env_files {
        load_env_file(env_file)?;
    }

    Ok(())
}

fn load_env_file(path: &str) -> Result<(), ConfigError> {
    if !Path::new(path).exists() {
        info!("Environment file {} not found, skipping", path);
        return Ok(());
    }

    dotenvy::from_filename_override(path).map_err(|source| ConfigError::EnvFile {
        path: path.to_string(),
        source,
    })?;
    info!("Loaded environment from: {}", path);
    Ok(())
}
