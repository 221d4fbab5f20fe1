//! Configuration management for code action orchestration

pub mod logging;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    /// Configuration sources could not be read or deserialized
    #[error("Failed to load configuration: {message}")]
    Load { message: String },

    /// Configuration values are out of range
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

impl ConfigError {
    pub fn load(message: impl Into<String>) -> Self {
        Self::Load {
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionsConfig {
    /// Execution engine configuration
    #[serde(default)]
    pub engine: EngineConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Execution engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Soft timeout for a single provider invocation, in milliseconds
    pub provider_timeout_ms: u64,
    /// Consecutive failures after which a provider is suppressed (0 = never)
    pub failure_threshold: u32,
    /// Soft budget for a single instrumentation hook, in milliseconds
    pub instrumentation_budget_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            provider_timeout_ms: 5_000,
            failure_threshold: 3,
            instrumentation_budget_ms: 50,
        }
    }
}

impl EngineConfig {
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    pub fn instrumentation_budget(&self) -> Duration {
        Duration::from_millis(self.instrumentation_budget_ms)
    }
}

/// Log output format
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format for development
    #[default]
    Pretty,
    /// Structured JSON format for production
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format
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

/// Config files probed by `ActionsConfig::load`, first match wins
const CONFIG_PATHS: [&str; 2] = ["mill-actions.toml", ".mill/actions.toml"];

/// Prefix for environment overrides, e.g. `MILL_ACTIONS__ENGINE__FAILURE_THRESHOLD=5`
const ENV_PREFIX: &str = "MILL_ACTIONS__";

impl ActionsConfig {
    /// Load configuration from environment and config files
    ///
    /// Configuration is loaded in the following priority order (highest to lowest):
    /// 1. Environment variables (MILL_ACTIONS__*)
    /// 2. `mill-actions.toml` or `.mill/actions.toml`
    /// 3. Default values
    pub fn load() -> ConfigResult<Self> {
        let mut figment = Figment::from(Serialized::defaults(ActionsConfig::default()));

        for toml_path in CONFIG_PATHS {
            let path = Path::new(toml_path);
            if path.exists() {
                tracing::info!(path = %toml_path, "Loading TOML configuration");
                figment = figment.merge(Toml::file(path));
                break;
            }
        }

        Self::finish(figment.merge(env_provider()))
    }

    /// Load configuration from an explicit TOML file, still honouring
    /// environment overrides
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::load(format!(
                "configuration file '{}' does not exist",
                path.display()
            )));
        }

        let figment = Figment::from(Serialized::defaults(ActionsConfig::default()))
            .merge(Toml::file(path))
            .merge(env_provider());
        Self::finish(figment)
    }

    fn finish(figment: Figment) -> ConfigResult<Self> {
        let config: ActionsConfig = figment
            .extract()
            .map_err(|e| ConfigError::load(e.to_string()))?;

        config.validate()?;

        tracing::debug!(
            provider_timeout_ms = config.engine.provider_timeout_ms,
            failure_threshold = config.engine.failure_threshold,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.engine.provider_timeout_ms == 0 {
            return Err(ConfigError::invalid("Provider timeout cannot be 0"));
        }

        if self.engine.instrumentation_budget_ms == 0 {
            return Err(ConfigError::invalid("Instrumentation budget cannot be 0"));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::invalid(format!(
                "Invalid log level '{}', must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            )));
        }

        Ok(())
    }
}

// Keys are lowercased by figment, so fields stay snake_case.
fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX).split("__")
}
