//! Configuration loading from files and the environment

use crate::{ConfigError, EngineConfig, Result};
use ::config::{Config, Environment, File, FileFormat};
use std::path::Path;

/// Default environment variable prefix: `CROSSPAY_DISCOVERY_MAX_SWAP_HOPS=3`
pub const ENV_PREFIX: &str = "CROSSPAY";

/// Loads `EngineConfig` from TOML/YAML/JSON files with optional environment
/// overrides.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from a file, format chosen by extension
    pub fn from_file(path: &Path) -> Result<EngineConfig> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ConfigError::LoadError("no file extension found".to_string()))?;

        let content = std::fs::read_to_string(path)?;

        match extension {
            "toml" => Self::from_toml(&content),
            "yaml" | "yml" => Self::from_yaml(&content),
            "json" => Self::from_json(&content),
            _ => Err(ConfigError::LoadError(format!(
                "unsupported file extension: {}",
                extension
            ))),
        }
    }

    pub fn from_toml(content: &str) -> Result<EngineConfig> {
        toml::from_str(content).map_err(ConfigError::from)
    }

    pub fn from_yaml(content: &str) -> Result<EngineConfig> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    pub fn from_json(content: &str) -> Result<EngineConfig> {
        serde_json::from_str(content).map_err(ConfigError::from)
    }

    /// Load from environment variables only
    ///
    /// Variables use the form `CROSSPAY_<SECTION>_<KEY>`, e.g.
    /// `CROSSPAY_EXECUTION_MAX_ATTEMPTS=5`.
    pub fn from_env() -> Result<EngineConfig> {
        Self::from_env_with_prefix(ENV_PREFIX)
    }

    pub fn from_env_with_prefix(prefix: &str) -> Result<EngineConfig> {
        let config = Config::builder()
            .add_source(Environment::with_prefix(prefix).separator("_"))
            .build()?;

        config.try_deserialize().map_err(ConfigError::from)
    }

    /// Load a file and overlay environment variables on top of it
    pub fn from_file_with_env(path: &Path, env_prefix: &str) -> Result<EngineConfig> {
        let format = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => FileFormat::Yaml,
            Some("json") => FileFormat::Json,
            _ => FileFormat::Toml,
        };

        let config = Config::builder()
            .add_source(File::from(path).format(format).required(true))
            .add_source(Environment::with_prefix(env_prefix).separator("_"))
            .build()?;

        config.try_deserialize().map_err(ConfigError::from)
    }
}
