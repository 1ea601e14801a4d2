//! Server configuration management for `wrought.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # [serve], [runtime], [cache], [model]
//! ├── types/         # ConfigError, diagnostics, global handle
//! ├── util.rs        # config file discovery
//! └── mod.rs         # AppConfig (this file)
//! ```
//!
//! A missing config file is not an error: every section has defaults and
//! the working directory becomes the root.

pub mod section;
pub mod types;
mod util;

use util::find_config_file;

pub use section::{CacheConfig, ModelConfig, RuntimeConfig, ServeConfig};
pub use types::{ConfigChange, ConfigDiagnostics, ConfigError, FieldPath, init_config, reload_config};

use crate::cli::{Cli, Commands};
use crate::{debug, log};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing `wrought.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// CLI arguments reference (internal use only)
    #[serde(skip)]
    pub cli: Option<&'static Cli>,

    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Directory containing the config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub serve: ServeConfig,

    #[serde(default)]
    pub runtime: RuntimeConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub model: ModelConfig,
}

impl AppConfig {
    /// Load, apply CLI overrides, and validate.
    pub fn load(cli: &'static Cli) -> Result<Self> {
        let config_path = match find_config_file(&cli.config) {
            Some(path) => path,
            None => {
                let cwd =
                    std::env::current_dir().context("Failed to get current working directory")?;
                debug!("config"; "{} not found, using defaults", cli.config.display());
                cwd.join(&cli.config)
            }
        };

        let mut config = Self::open(config_path)?;
        config.cli = Some(cli);
        config.apply_command_options(cli);
        config.validate()?;
        Ok(config)
    }

    /// Read `config_path` (defaults when absent) and resolve paths against
    /// its directory.
    pub fn open(config_path: PathBuf) -> Result<Self> {
        let mut config = if config_path.is_file() {
            Self::from_path(&config_path)?
        } else {
            Self::default()
        };

        let root = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        config.config_path = config_path;
        config.normalize_paths(&root);
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Toml)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::Toml)?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring: {}", display_path, fields.join(", "));
    }

    pub fn get_root(&self) -> &Path {
        &self.root
    }

    /// Normalize all paths relative to the root directory.
    fn normalize_paths(&mut self, root: &Path) {
        let root = crate::utils::path::normalize_path(root);
        self.config_path = crate::utils::path::normalize_path(&self.config_path);
        self.model.normalize(&root);
        self.root = root;
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    fn apply_command_options(&mut self, cli: &Cli) {
        match &cli.command {
            Commands::Serve {
                interface,
                port,
                debug,
                verbose,
            } => {
                Self::update_option(&mut self.serve.interface, interface.as_ref());
                Self::update_option(&mut self.serve.port, port.as_ref());
                self.runtime.debug |= *debug;
                crate::logger::set_verbose(*verbose || self.runtime.debug);
            }
            Commands::Check { verbose, .. } => {
                crate::logger::set_verbose(*verbose || self.runtime.debug);
            }
        }
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate every section, reporting all errors at once.
    pub fn validate(&self) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();

        self.serve.validate(&mut diag);
        self.cache.validate(&mut diag);
        self.model.validate(&mut diag);

        if self.runtime.debug && !self.serve.interface.is_loopback() {
            diag.warn(
                FieldPath::new("runtime.debug"),
                format!(
                    "admin API is reachable on {} without authentication",
                    self.serve.interface
                ),
            );
        }

        diag.print_warnings();
        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }
}

// ============================================================================
// Test Helpers
// ============================================================================

/// Parse config text, panicking on unknown fields so typos in tests fail.
#[cfg(test)]
pub fn test_parse_config(content: &str) -> AppConfig {
    let (parsed, ignored) = AppConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================
