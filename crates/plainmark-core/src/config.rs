//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/plainmark/config.toml)
//! 3. Environment variables (PLAINMARK_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix
const ENV_PREFIX: &str = "PLAINMARK";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// The bookmark file
    #[serde(default = "default_bookmarks_file")]
    pub bookmarks_file: PathBuf,

    /// Write logs here instead of stderr
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Warn when adding a URL that is already bookmarked
    #[serde(default = "default_true")]
    pub warn_duplicates: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bookmarks_file: default_bookmarks_file(),
            log_file: None,
            warn_duplicates: true,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (PLAINMARK_FILE, PLAINMARK_LOG_FILE, PLAINMARK_WARN_DUPLICATES)
    /// 2. Config file (~/.config/plainmark/config.toml or PLAINMARK_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring a path given on the command line
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        Self::load_from_path(&Self::file_path_with_cli_override(path))
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = Self::load_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load only what the config file says, without environment overrides
    ///
    /// Use this before writing the file back, so values that only live in
    /// the environment are not persisted.
    pub fn load_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // PLAINMARK_FILE
        if let Ok(val) = std::env::var(format!("{}_FILE", ENV_PREFIX)) {
            if !val.is_empty() {
                self.bookmarks_file = PathBuf::from(val);
            }
        }

        // PLAINMARK_LOG_FILE
        if let Ok(val) = std::env::var(format!("{}_LOG_FILE", ENV_PREFIX)) {
            self.log_file = if val.is_empty() {
                None
            } else {
                Some(PathBuf::from(val))
            };
        }

        // PLAINMARK_WARN_DUPLICATES
        if let Ok(val) = std::env::var(format!("{}_WARN_DUPLICATES", ENV_PREFIX)) {
            self.warn_duplicates = val.eq_ignore_ascii_case("true") || val == "1";
        }
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with PLAINMARK_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("plainmark")
            .join("config.toml")
    }

    /// The config file to use: the command line path if given, else the default
    pub fn file_path_with_cli_override(path: Option<&PathBuf>) -> PathBuf {
        path.cloned().unwrap_or_else(Self::config_file_path)
    }

    /// Get the path to the bookmark file
    pub fn bookmarks_path(&self) -> &Path {
        &self.bookmarks_file
    }
}

/// Get the default bookmark file location
fn default_bookmarks_file() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("plainmark")
        .join("bookmarks.txt")
}

fn default_true() -> bool {
    true
}
