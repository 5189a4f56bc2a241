//! Host configuration
//!
//! Loaded from the path given as the first argument, otherwise from
//! `context_app.toml` in the working directory when present, otherwise the
//! defaults are used.

use render_context::{Config, ConfigError, ContextConfig, WindowConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name
pub const DEFAULT_CONFIG_PATH: &str = "context_app.toml";

/// Complete host configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Default log level when `RUST_LOG` is not set
    pub log_level: String,
    /// Window parameters
    pub window: WindowConfig,
    /// Graphics context parameters
    pub context: ContextConfig,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            window: WindowConfig::default(),
            context: ContextConfig::new("context_app"),
        }
    }
}

impl Config for HostConfig {}

impl HostConfig {
    /// Resolve the configuration for this run
    pub fn resolve(explicit_path: Option<&str>) -> Result<Self, ConfigError> {
        match explicit_path {
            Some(path) => Self::load_from_file(path),
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::load_from_file(DEFAULT_CONFIG_PATH),
            None => Ok(Self::default()),
        }
    }
}
