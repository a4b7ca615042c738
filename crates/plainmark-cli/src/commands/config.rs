//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use plainmark_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "bookmarks_file": config.bookmarks_file,
                    "log_file": config.log_file,
                    "warn_duplicates": config.warn_duplicates
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.bookmarks_file.display());
        }
        OutputFormat::Human => {
            let effective_path = Config::file_path_with_cli_override(config_path);
            println!("Configuration:");
            println!("  bookmarks_file:  {}", config.bookmarks_file.display());
            println!(
                "  log_file:        {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(stderr)".to_string())
            );
            println!("  warn_duplicates: {}", config.warn_duplicates);
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
///
/// Only the file's own values are written back; `PLAINMARK_*` overrides
/// in the environment stay out of it.
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let save_path = Config::file_path_with_cli_override(config_path);
    let mut config = Config::load_file(&save_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "bookmarks_file" => {
            if value.is_empty() {
                bail!("bookmarks_file cannot be empty");
            }
            config.bookmarks_file = value.into();
        }
        "log_file" => {
            config.log_file = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.into())
            };
        }
        "warn_duplicates" => {
            config.warn_duplicates = value
                .parse()
                .context("Invalid value for warn_duplicates. Use 'true' or 'false'.")?;
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: bookmarks_file, log_file, warn_duplicates",
                key
            );
        }
    }
    Ok(())
}
