//! Configuration for the crosspay routing engine
//!
//! Supports TOML, YAML, and JSON files, environment variable overrides
//! (`CROSSPAY_*`), and bound validation before the engine is constructed.

mod config;
mod loader;
mod validation;

pub use self::config::*;
pub use loader::*;
pub use validation::*;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    LoadError(String),

    #[error("config validation failed: {0}")]
    ValidationError(String),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("config library error: {0}")]
    ConfigLibError(#[from] ::config::ConfigError),

    #[error("toml parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("yaml parse error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("json parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
