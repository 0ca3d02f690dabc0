//! Central module for application-wide configuration settings.
//!
//! This module handles loading and managing configuration parameters such as
//! the listen address, the database path, token signing and password hashing
//! parameters, upload limits and heat-map scaling.
//!
//! Configuration is loaded from (in order of precedence, highest first):
//! 1. Environment variables prefixed with `MARKET_`, using `__` between
//!    sections (`MARKET_AUTH__JWT_SECRET`)
//! 2. A TOML file (`market-analytics.toml` unless `--config` names another)
//! 3. Default values

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::AppError;

pub const CONFIG_FILE_NAME: &str = "market-analytics.toml";
pub const ENV_PREFIX: &str = "MARKET_";

/// Signing secret used when none is configured. Only suitable for development.
pub const DEVELOPMENT_JWT_SECRET: &str = "development-secret-change-me";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub uploads: UploadConfig,
    pub heatmap: HeatMapConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file, or `:memory:`.
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_days: u32,
    /// PBKDF2 rounds for newly hashed passwords.
    pub hash_iterations: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_profile_picture_bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatMapConfig {
    /// Average customer count that maps to full (100) traffic intensity.
    pub max_expected_customers: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("farmers-market-analytics.db"),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEVELOPMENT_JWT_SECRET.to_string(),
            token_ttl_days: 30,
            hash_iterations: 100_000,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_profile_picture_bytes: 5 * 1024 * 1024,
        }
    }
}

impl Default for HeatMapConfig {
    fn default() -> Self {
        Self {
            max_expected_customers: 50.0,
        }
    }
}

impl Config {
    /// Load configuration from the default file location and the environment.
    pub fn load() -> Result<Self, AppError> {
        Self::load_from(None)
    }

    /// Load configuration, reading `path` instead of the default file when given.
    pub fn load_from(path: Option<PathBuf>) -> Result<Self, AppError> {
        let file = path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
        Self::figment(&file).extract::<Self>()?.validated()
    }

    fn figment(file: &Path) -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn validated(self) -> Result<Self, AppError> {
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(AppError::config("auth.jwt_secret must not be empty"));
        }
        if self.auth.jwt_secret == DEVELOPMENT_JWT_SECRET {
            warn!("auth.jwt_secret is the development default; set MARKET_AUTH__JWT_SECRET");
        }
        if self.auth.token_ttl_days == 0 {
            return Err(AppError::config("auth.token_ttl_days must be at least 1"));
        }
        if self.auth.hash_iterations == 0 {
            return Err(AppError::config("auth.hash_iterations must be at least 1"));
        }
        if self.uploads.max_profile_picture_bytes == 0 {
            return Err(AppError::config(
                "uploads.max_profile_picture_bytes must be at least 1",
            ));
        }
        let max_customers = self.heatmap.max_expected_customers;
        if max_customers.is_nan() || max_customers <= 0.0 {
            return Err(AppError::config(
                "heatmap.max_expected_customers must be positive",
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
