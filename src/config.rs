//! Configuration module for jsonrest
//!
//! This module handles loading and parsing configuration from TOML files,
//! with sensible defaults for all optional values.

use serde::{Deserialize, Serialize};
use std::path::Path;

use jsonrest_query::query::{ParamDefaults, PropertyPath};

use crate::error::{JsonRestError, Result};
use crate::store::DEFAULT_FIRST_PAGE_SIZE;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Query defaults
    pub query: QueryConfig,

    /// Record store configuration
    pub store: StoreConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            JsonRestError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        Self::parse_str(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn parse_str(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| JsonRestError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.query.default_top == 0 {
            return Err(JsonRestError::Config(
                "query.default_top cannot be 0".to_string(),
            ));
        }

        if self.query.default_page_size == 0 {
            return Err(JsonRestError::Config(
                "query.default_page_size cannot be 0".to_string(),
            ));
        }

        PropertyPath::parse(&self.query.id_prop_name).map_err(|e| {
            JsonRestError::Config(format!("query.id_prop_name is not a valid path: {}", e))
        })?;

        if self.store.first_page_size == 0 {
            return Err(JsonRestError::Config(
                "store.first_page_size cannot be 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Serialize to pretty TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| JsonRestError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Set a parameter by dotted path (e.g. `query.default_top`)
    pub fn set_param(&mut self, path: &str, value: &str) -> Result<()> {
        fn number(path: &str, value: &str) -> Result<usize> {
            value.parse().map_err(|_| {
                JsonRestError::Config(format!("Invalid value for {}: {}", path, value))
            })
        }

        match path {
            "logging.level" => self.logging.level = value.to_string(),
            "logging.format" => {
                self.logging.format = match value.to_lowercase().as_str() {
                    "pretty" => LogFormat::Pretty,
                    "json" => LogFormat::Json,
                    _ => {
                        return Err(JsonRestError::Config(format!(
                            "Invalid logging.format value: {}. Expected: pretty, json",
                            value
                        )))
                    }
                }
            }
            "query.default_top" => self.query.default_top = number(path, value)?,
            "query.default_page_size" => self.query.default_page_size = number(path, value)?,
            "query.id_prop_name" => self.query.id_prop_name = value.to_string(),
            "store.first_page_size" => self.store.first_page_size = number(path, value)?,
            _ => return Err(JsonRestError::Config(format!("Unknown config key: {}", path))),
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (pretty, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format
    #[default]
    Pretty,

    /// JSON format
    Json,
}

/// Query defaults applied when a request leaves them out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Page length for offset and cursor pagination
    pub default_top: usize,

    /// Page length for page-number pagination
    pub default_page_size: usize,

    /// Id property for endpoints created without one
    pub id_prop_name: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        let defaults = ParamDefaults::default();
        Self {
            default_top: defaults.top,
            default_page_size: defaults.page_size,
            id_prop_name: "id".to_string(),
        }
    }
}

impl QueryConfig {
    /// Parameter defaults for binding query strings
    pub fn param_defaults(&self) -> ParamDefaults {
        ParamDefaults {
            top: self.default_top,
            page_size: self.default_page_size,
        }
    }
}

/// Record store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Endpoints returned when listing
    pub first_page_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            first_page_size: DEFAULT_FIRST_PAGE_SIZE,
        }
    }
}
