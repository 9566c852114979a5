use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::framework::constants;
use crate::framework::error::ConfigError;
use crate::service::PropertyMap;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigFormat {
    /// JSON format (.json)
    Json,
    /// YAML format (.yaml, .yml) - requires "yaml-config" feature
    #[cfg(feature = "yaml-config")]
    Yaml,
    /// TOML format (.toml) - requires "toml-config" feature
    #[cfg(feature = "toml-config")]
    Toml,
}

impl ConfigFormat {
    pub fn name(&self) -> &'static str {
        match self {
            ConfigFormat::Json => "json",
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => "yaml",
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => "toml",
        }
    }

    /// Determine format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "json" => Some(ConfigFormat::Json),
                #[cfg(feature = "yaml-config")]
                "yaml" | "yml" => Some(ConfigFormat::Yaml),
                #[cfg(feature = "toml-config")]
                "toml" => Some(ConfigFormat::Toml),
                _ => None,
            })
    }
}

/// Framework launch configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameworkConfig {
    /// Forward DEBUG/INFO framework diagnostics to the sink. WARNING and
    /// ERROR records are always forwarded.
    pub log_enabled: bool,
    /// Framework properties, visible to components through
    /// [`Framework::property`](crate::framework::Framework::property).
    pub properties: PropertyMap,
    /// Prefix for worker threads that run asynchronous enable/disable.
    pub worker_thread_prefix: String,
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        Self {
            log_enabled: false,
            properties: PropertyMap::new(),
            worker_thread_prefix: constants::DEFAULT_WORKER_PREFIX.to_string(),
        }
    }
}

impl FrameworkConfig {
    /// Load a configuration file, picking the format from its extension.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let format = ConfigFormat::from_path(path)
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.to_path_buf()))?;
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents, format)
    }

    pub fn parse(contents: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        let deserialization = |source: Box<dyn std::error::Error + Send + Sync>| {
            ConfigError::Deserialization { format: format.name(), source }
        };
        match format {
            ConfigFormat::Json => {
                serde_json::from_str(contents).map_err(|e| deserialization(Box::new(e)))
            }
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => {
                serde_yaml::from_str(contents).map_err(|e| deserialization(Box::new(e)))
            }
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::from_str(contents).map_err(|e| deserialization(Box::new(e))),
        }
    }

    pub fn with_log_enabled(mut self, enabled: bool) -> Self {
        self.log_enabled = enabled;
        self
    }

    pub fn with_property(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }
}
