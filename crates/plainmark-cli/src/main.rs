//! plainmark CLI
//!
//! Command-line interface for plainmark - plaintext bookmark management.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use plainmark_core::{Config, Store, StoreError};

mod commands;
mod editor;
mod metadata;
mod output;

use commands::bookmark::{AddArgs, EditArgs};
use output::{Output, OutputFormat};

/// Environment variable holding the log level
const LOG_ENV: &str = "PLAINMARK_LOG";

#[derive(Parser)]
#[command(name = "pmark")]
#[command(about = "plainmark - bookmarks in a plain text file")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Bookmark file to use instead of the configured one
    #[arg(long, global = true)]
    file: Option<PathBuf>,

    /// Config file to use instead of the default
    #[arg(long = "config", global = true)]
    config_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a bookmark
    Add(AddArgs),
    /// List bookmarks
    #[command(alias = "ls")]
    List {
        /// Only bookmarks with this tag (repeat to require several)
        #[arg(short, long)]
        tag: Vec<String>,
    },
    /// Search URLs, titles and notes
    Search {
        /// Search query
        query: String,
    },
    /// Show a bookmark
    Show {
        /// Bookmark id
        id: String,
    },
    /// Edit a bookmark
    Edit {
        /// Bookmark id
        id: String,
        #[command(flatten)]
        args: EditArgs,
    },
    /// Remove a bookmark
    #[command(alias = "rm")]
    Remove {
        /// Bookmark id
        id: String,
    },
    /// Open a bookmark in the browser
    Open {
        /// Bookmark id
        id: String,
    },
    /// List all tags
    Tags,
    /// Check the bookmark file for entries that could not be read
    Check,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (bookmarks_file, log_file, warn_duplicates)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    match run(cli, &output).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:?}", err);
            if let Some(suggestion) = recovery_suggestion(&err) {
                eprintln!("\n{}", suggestion);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, output: &Output) -> Result<()> {
    // Config commands don't need the store
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), cli.config_file.as_ref(), output);
    }

    let mut config = Config::load_with_cli_override(cli.config_file.as_ref())
        .context("Failed to load configuration")?;
    if let Some(file) = cli.file {
        config.bookmarks_file = file;
    }

    init_logging(&config);

    let mut store = Store::open(&config).with_context(|| {
        format!(
            "Failed to open bookmark file {}",
            config.bookmarks_path().display()
        )
    })?;

    // Parse problems are reported by `check`; other commands just mention them
    if !store.warnings().is_empty() && !matches!(cli.command, Commands::Check) {
        output.warning(&format!(
            "{} entr{} in {} could not be read and will be kept as-is. Run `pmark check` for details.",
            store.warnings().len(),
            if store.warnings().len() == 1 { "y" } else { "ies" },
            store.path().display()
        ));
    }

    match cli.command {
        Commands::Add(args) => {
            commands::bookmark::add(&mut store, args, config.warn_duplicates, output).await
        }
        Commands::List { tag } => commands::bookmark::list(&store, tag, output),
        Commands::Search { query } => commands::bookmark::search(&store, query, output),
        Commands::Show { id } => commands::bookmark::show(&store, &id, output),
        Commands::Edit { id, args } => commands::bookmark::edit(&mut store, &id, args, output),
        Commands::Remove { id } => commands::bookmark::remove(&mut store, &id, output),
        Commands::Open { id } => commands::bookmark::open(&store, &id, output),
        Commands::Tags => commands::tag::list(&store, output),
        Commands::Check => commands::check::check(&store, output),
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Suggestion for a store error anywhere in the error chain
fn recovery_suggestion(err: &anyhow::Error) -> Option<&'static str> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<StoreError>())
        .and_then(StoreError::recovery_suggestion)
}

/// Initialize logging
///
/// Level comes from PLAINMARK_LOG (default `warn`). Logs go to the
/// configured log file, or stderr when none is set.
fn init_logging(config: &Config) {
    let level = std::env::var(LOG_ENV).unwrap_or_else(|_| "warn".to_string());
    let env_filter = EnvFilter::new(format!("plainmark_core={},pmark={}", level, level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    match &config.log_file {
        Some(log_path) => {
            let log_file = match OpenOptions::new().create(true).append(true).open(log_path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
                    return;
                }
            };
            let _ = builder.with_ansi(false).with_writer(Mutex::new(log_file)).try_init();
        }
        None => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }
}
