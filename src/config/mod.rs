//! Application configuration.
//!
//! Aggregates configuration from all modules into a single Config struct
//! that can be loaded from YAML files or environment variables.

mod auth;
mod storage;

pub use auth::AuthConfig;
pub use storage::{MemoryConfig, SqliteConfig, StorageConfig, StorageType};

use serde::Deserialize;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "EXPENSE_SYNC_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "EXPENSE_SYNC";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "EXPENSE_SYNC_LOG";
/// Environment variable selecting the log output format (`json` or text).
pub const LOG_FORMAT_ENV_VAR: &str = "EXPENSE_SYNC_LOG_FORMAT";

/// Environment variable for the account email used by the binary.
pub const ACCOUNT_EMAIL_ENV_VAR: &str = "EXPENSE_SYNC_EMAIL";
/// Environment variable for the account password used by the binary.
pub const ACCOUNT_PASSWORD_ENV_VAR: &str = "EXPENSE_SYNC_PASSWORD";
/// Environment variable for the first name used when signing up.
pub const ACCOUNT_FIRST_NAME_ENV_VAR: &str = "EXPENSE_SYNC_FIRST_NAME";
/// Environment variable for the last name used when signing up.
pub const ACCOUNT_LAST_NAME_ENV_VAR: &str = "EXPENSE_SYNC_LAST_NAME";

/// Configuration loading error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Document store configuration.
    pub storage: StorageConfig,
    /// Authentication configuration.
    pub auth: AuthConfig,
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `config.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Create config for testing: in-memory store, cheap password hashing.
    pub fn for_test() -> Self {
        Self {
            storage: StorageConfig::default(),
            auth: AuthConfig::for_test(),
        }
    }
}
