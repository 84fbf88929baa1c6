//! Configuration management with environment variable support and validation.

use anyhow::{anyhow, Result};
use config::{Config, Environment};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::memory::DEFAULT_PATTERN_CAPACITY;
use crate::policy::PolicyConfig;

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_seconds: u64,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    pub max_request_size_kb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_seconds: 30,
            enable_cors: true,
            cors_origins: vec!["*".to_string()],
            max_request_size_kb: 512,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "text"
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

/// Orchestrator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    pub specialist_timeout_seconds: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            specialist_timeout_seconds: 60,
        }
    }
}

/// Memory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    pub pattern_capacity: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            pattern_capacity: DEFAULT_PATTERN_CAPACITY,
        }
    }
}

/// Notebook storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data"),
        }
    }
}

/// Main settings structure with all configuration sections
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub orchestrator: OrchestratorConfig,
    pub memory: MemoryConfig,
    pub policy: PolicyConfig,
    pub storage: StorageConfig,
}

impl Settings {
    /// Load settings from configuration files and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings, layering an explicit settings file over the bundled
    /// defaults. Without one, a local `config` file is picked up if present.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let builder = Config::builder()
            // Start with the built-in defaults
            .add_source(config::File::from_str(
                include_str!("../config.toml"),
                config::FileFormat::Toml,
            ));

        let builder = match path {
            Some(path) => builder.add_source(config::File::from(path)),
            None => builder.add_source(config::File::with_name("config").required(false)),
        };

        let config = builder
            // Add environment variables with TUTOR_ prefix
            .add_source(
                Environment::with_prefix("TUTOR")
                    .separator("__")
                    .list_separator(",")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.validate()?;

        Ok(settings)
    }

    /// Validate settings for consistency
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow!("Server port cannot be 0"));
        }
        if self.server.request_timeout_seconds == 0 {
            return Err(anyhow!("Request timeout cannot be 0"));
        }
        if self.orchestrator.specialist_timeout_seconds == 0 {
            return Err(anyhow!("Specialist timeout cannot be 0"));
        }
        if self.memory.pattern_capacity == 0 {
            return Err(anyhow!("Pattern capacity cannot be 0"));
        }

        if !(0.0..=1.0).contains(&self.policy.guidance_cutoff)
            || !(0.0..=1.0).contains(&self.policy.proactive_cutoff)
            || !(0.0..=1.0).contains(&self.policy.independent_cutoff)
        {
            return Err(anyhow!("Policy autonomy cutoffs must be within 0.0..=1.0"));
        }
        if self.policy.stuck_minutes_medium > self.policy.stuck_minutes_high {
            return Err(anyhow!(
                "stuck_minutes_medium cannot exceed stuck_minutes_high"
            ));
        }

        if !self.storage.root.exists() {
            warn!("Storage root does not exist yet: {:?}", self.storage.root);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.memory.pattern_capacity, 50);
        assert_eq!(settings.policy.error_count_high, 3);
    }

    #[test]
    fn rejects_inverted_stuck_thresholds() {
        let mut settings = Settings::default();
        settings.policy.stuck_minutes_medium = 20.0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_cutoffs() {
        let mut settings = Settings::default();
        settings.policy.independent_cutoff = 1.5;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn explicit_settings_file_layers_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deploy.toml");
        std::fs::write(&path, "[server]\nport = 9999\n").unwrap();

        let settings = Settings::load_from(Some(&path)).unwrap();
        assert_eq!(settings.server.port, 9999);
        // Untouched sections keep the bundled defaults.
        assert_eq!(settings.memory.pattern_capacity, 50);
    }

    #[test]
    fn missing_explicit_settings_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(Settings::load_from(Some(&path)).is_err());
    }

    #[test]
    fn bundled_config_parses() {
        let config = Config::builder()
            .add_source(config::File::from_str(
                include_str!("../config.toml"),
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let settings: Settings = config.try_deserialize().unwrap();
        assert!(settings.validate().is_ok());
    }
}
