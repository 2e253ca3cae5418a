//! Configuration for tracking-plan builds
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (typer.toml)
//! - Environment variables (TYPER_*)
//!
//! ## Example config file (typer.toml):
//! ```toml
//! [plan]
//! path = "./tracking-plan"
//! source_label = "Acme tracking plan"
//!
//! [codegen]
//! languages = ["typescript", "kotlin"]
//!
//! [output]
//! format = "pretty"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::codegen::Language;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TyperConfig {
    /// Where the tracking plan lives
    #[serde(default)]
    pub plan: PlanConfig,

    /// Code generation settings
    #[serde(default)]
    pub codegen: CodegenConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Tracking plan configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanConfig {
    /// Event schema file or directory of them
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Label used when an event schema has no title
    #[serde(default = "default_source_label")]
    pub source_label: String,
}

/// Code generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodegenConfig {
    /// Languages a build allocates identifiers for
    #[serde(default = "default_languages")]
    pub languages: Vec<Language>,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

// Default value functions
fn default_source_label() -> String {
    "tracking plan".to_string()
}

fn default_languages() -> Vec<Language> {
    vec![Language::TypeScript]
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            path: None,
            source_label: default_source_label(),
        }
    }
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            languages: default_languages(),
        }
    }
}

impl TyperConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // Load from default locations
        let config_locations = ["typer.toml", ".typer.toml", "config/typer.toml"];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "typer", "typer") {
            let xdg_config = config_dir.config_dir().join("typer.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        // Load from specified path
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Load from environment variables (TYPER_*)
        builder = builder.add_source(
            Environment::with_prefix("TYPER")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("codegen.languages")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// The plan path, resolved against the working directory.
    ///
    /// Fails when a relative path is configured and the working directory
    /// cannot be read.
    pub fn plan_path(&self) -> std::io::Result<Option<PathBuf>> {
        let Some(path) = &self.plan.path else {
            return Ok(None);
        };
        if path.is_absolute() {
            return Ok(Some(path.clone()));
        }
        Ok(Some(std::env::current_dir()?.join(path)))
    }
}
