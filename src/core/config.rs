//! Configuration management

use crate::store::{CollectionSync, ResolutionPolicy};
use clap::Parser;
use config::{Config as ConfigBuilder, ConfigError as BuilderError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid api configuration: {0}")]
    InvalidApi(String),

    #[error("Invalid cache configuration: {0}")]
    InvalidCache(String),

    #[error("Invalid logging configuration: {0}")]
    InvalidLogging(String),

    #[error("Invalid stores configuration: {0}")]
    InvalidStores(String),

    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
}

impl From<BuilderError> for ConfigError {
    fn from(err: BuilderError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// Resource names accepted as keys of `stores.sync`
pub const RESOURCE_NAMES: [&str; 8] = [
    "users",
    "roles",
    "companies",
    "products",
    "categories",
    "units",
    "providers",
    "stock_movements",
];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
    pub stores: StoresConfig,
}

impl Config {
    /// Load configuration with precedence: CLI args > Environment variables > Config file > Defaults
    pub fn load(cli_args: &CliArgs) -> Result<Self, ConfigError> {
        let mut builder = with_defaults(ConfigBuilder::builder())?;

        if let Some(config_path) = &cli_args.config {
            if !config_path.exists() {
                return Err(ConfigError::FileNotFound(config_path.display().to_string()));
            }
            builder = builder.add_source(File::from(config_path.as_path()));
        }

        // Example: INVENTORY_API__BASE_URL=https://inventory.example.com/api
        builder = builder.add_source(
            Environment::with_prefix("INVENTORY")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(base_url) = &cli_args.base_url {
            builder = builder.set_override("api.base_url", base_url.clone())?;
        }
        if let Some(cache_path) = &cli_args.cache {
            builder = builder.set_override("cache.path", cache_path.display().to_string())?;
        }
        if let Some(log_level) = &cli_args.log_level {
            builder = builder.set_override("logging.level", log_level.clone())?;
        }

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path, on top of the defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let config: Config = with_defaults(ConfigBuilder::builder())?
            .add_source(File::from(path))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.api.validate()?;
        self.cache.validate()?;
        self.logging.validate()?;
        self.stores.validate()?;
        Ok(())
    }
}

fn with_defaults(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
    Ok(builder
        .set_default("api.base_url", "http://127.0.0.1:8000/api")?
        .set_default("api.timeout", 30)?
        .set_default("api.connect_timeout", 10)?
        .set_default("api.user_agent", concat!("inventory-console/", env!("CARGO_PKG_VERSION")))?
        .set_default("cache.path", "./data/console-cache.db")?
        .set_default("cache.pool_size", 4)?
        .set_default("cache.busy_timeout", 5000)?
        .set_default("logging.level", "info")?
        .set_default("logging.format", "text")?
        .set_default("logging.output", "stderr")?
        .set_default("logging.max_file_size", 10485760)? // 10 MB
        .set_default("logging.max_backups", 5)?
        .set_default("stores.resolution", "last_resolved")?)
}

/// Command-line arguments
#[derive(Debug, Parser)]
#[command(name = "inventory-console")]
#[command(about = "Inventory administration console", long_about = None)]
pub struct CliArgs {
    /// Path to configuration file (TOML format)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Backend base URL
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Cache database path
    #[arg(long, value_name = "PATH")]
    pub cache: Option<PathBuf>,

    /// Log level (debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: crate::cli::Command,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: u64,         // seconds
    pub connect_timeout: u64, // seconds
    pub user_agent: String,
}

impl ApiConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| ConfigError::InvalidApi(format!("base_url is not a valid URL: {}", e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidApi("base_url must use http or https".to_string()));
        }

        if self.timeout == 0 {
            return Err(ConfigError::InvalidApi("timeout must be greater than 0".to_string()));
        }

        if self.connect_timeout == 0 {
            return Err(ConfigError::InvalidApi("connect_timeout must be greater than 0".to_string()));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub path: PathBuf,
    pub pool_size: u32,
    pub busy_timeout: u64, // milliseconds
}

impl CacheConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidCache("path cannot be empty".to_string()));
        }

        if self.pool_size == 0 {
            return Err(ConfigError::InvalidCache("pool_size must be greater than 0".to_string()));
        }

        if self.busy_timeout == 0 {
            return Err(ConfigError::InvalidCache("busy_timeout must be greater than 0".to_string()));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub output: String,
    pub log_file: Option<PathBuf>,
    pub max_file_size: usize, // bytes
    pub max_backups: usize,
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.level.as_str()) {
            return Err(ConfigError::InvalidLogging(format!(
                "level must be one of: {:?}",
                valid_levels
            )));
        }

        let valid_formats = ["json", "text"];
        if !valid_formats.contains(&self.format.as_str()) {
            return Err(ConfigError::InvalidLogging(format!(
                "format must be one of: {:?}",
                valid_formats
            )));
        }

        let valid_outputs = ["stdout", "stderr", "file"];
        if !valid_outputs.contains(&self.output.as_str()) {
            return Err(ConfigError::InvalidLogging(format!(
                "output must be one of: {:?}",
                valid_outputs
            )));
        }

        if self.output == "file" && self.log_file.is_none() {
            return Err(ConfigError::InvalidLogging(
                "log_file must be specified when output is 'file'".to_string(),
            ));
        }

        if self.max_file_size == 0 {
            return Err(ConfigError::InvalidLogging("max_file_size must be greater than 0".to_string()));
        }

        if self.max_backups == 0 {
            return Err(ConfigError::InvalidLogging("max_backups must be greater than 0".to_string()));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoresConfig {
    pub resolution: ResolutionPolicy,
    /// Per-resource collection sync mode, keyed by resource name
    #[serde(default)]
    pub sync: HashMap<String, CollectionSync>,
}

impl StoresConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for name in self.sync.keys() {
            if !RESOURCE_NAMES.contains(&name.as_str()) {
                return Err(ConfigError::InvalidStores(format!(
                    "unknown resource '{}' in stores.sync, expected one of: {:?}",
                    name, RESOURCE_NAMES
                )));
            }
        }
        Ok(())
    }

    /// Sync mode configured for a resource, if any
    pub fn sync_for(&self, resource: &str) -> Option<CollectionSync> {
        self.sync.get(resource).copied()
    }
}

impl Default for StoresConfig {
    fn default() -> Self {
        Self {
            resolution: ResolutionPolicy::LastResolved,
            sync: HashMap::new(),
        }
    }
}
