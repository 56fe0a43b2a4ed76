//! Archivist - Incremental Evernote changelog archiver
//!
//! This is the main entry point for the `archivist` command.
//!
//! # Commands
//!
//! - `sync` - Archive every version not yet on disk (default)
//! - `backfill` - Fetch versions missing below the highest archived one
//! - `status` - Compare the remote version with the local archive
//! - `notebooks` - Save a snapshot of the account's notebooks
//! - `init` - Write a default settings file

mod commands;

use anyhow::Result;
use chunks::SyncConfig;
use clap::{Parser, Subcommand};
use log::{debug, error};
use std::path::PathBuf;
use std::process::ExitCode;

/// Archive every version of an Evernote account's changelog as JSON.
#[derive(Parser, Debug)]
#[command(name = "archivist")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file (defaults to ~/.config/archivist/settings.json)
    #[arg(global = true, short, long)]
    config: Option<PathBuf>,

    /// Directory receiving the <version>.json artifacts
    #[arg(global = true, short, long)]
    data_dir: Option<PathBuf>,

    /// Use sandbox.evernote.com
    #[arg(global = true, long)]
    sandbox: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Commands {
    /// Fetch and archive every version newer than the archive
    Sync {
        /// Pause between versions, in milliseconds
        #[arg(long)]
        pacing_ms: Option<u64>,

        /// Resume point when the archive is empty
        #[arg(long)]
        floor: Option<i32>,
    },

    /// Fetch versions missing below the highest archived version
    Backfill {
        /// Lowest version to fetch
        #[arg(long, default_value_t = 1)]
        down_to: i32,

        /// Pause between versions, in milliseconds
        #[arg(long)]
        pacing_ms: Option<u64>,
    },

    /// Show the latest remote version and the archive position
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Save the account's notebooks to notebooks.json
    Notebooks,

    /// Write a settings file with default values
    Init {
        /// Overwrite an existing settings file
        #[arg(long)]
        force: bool,
    },
}

impl Default for Commands {
    fn default() -> Self {
        Commands::Sync {
            pacing_ms: None,
            floor: None,
        }
    }
}

fn main() -> ExitCode {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    // Bootstrap config directory
    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    let command = cli.command.clone().unwrap_or_default();
    let settings = match load_settings(&cli, &command) {
        Ok(settings) => apply_overrides(settings, &cli, &command),
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::FAILURE;
        }
    };
    debug!("Settings: {:?}", settings);

    let result = match command {
        Commands::Sync { .. } => commands::sync(&settings),
        Commands::Backfill { down_to, .. } => commands::backfill(&settings, down_to),
        Commands::Status { json } => commands::status(&settings, json),
        Commands::Notebooks => commands::notebooks(&settings),
        Commands::Init { force } => commands::init(&settings, cli.config.as_deref(), force),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Settings from `--config` or the default file, with the env token applied
///
/// `init` may point `--config` at a file that does not exist yet.
fn load_settings(cli: &Cli, command: &Commands) -> Result<SyncConfig> {
    match &cli.config {
        Some(path) if matches!(command, Commands::Init { .. }) && !path.exists() => {
            Ok(SyncConfig::default())
        }
        Some(path) => Ok(SyncConfig::from_file(path)?.with_env()),
        None => SyncConfig::load(),
    }
}

/// Command-line flags take priority over everything else
fn apply_overrides(mut settings: SyncConfig, cli: &Cli, command: &Commands) -> SyncConfig {
    if let Some(dir) = &cli.data_dir {
        settings.data_dir = dir.clone();
    }
    if cli.sandbox {
        settings.sandbox = true;
    }
    match command {
        Commands::Sync { pacing_ms, floor } => {
            if let Some(ms) = pacing_ms {
                settings.pacing_ms = *ms;
            }
            if let Some(floor) = floor {
                settings.default_floor = *floor;
            }
        }
        Commands::Backfill {
            pacing_ms: Some(ms),
            ..
        } => settings.pacing_ms = *ms,
        _ => {}
    }
    settings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_is_default_command() {
        let cli = Cli::try_parse_from(["archivist"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.command.unwrap_or_default(), Commands::default());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["archivist", "status", "--data-dir", "/tmp/a", "--sandbox"]).unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/a")));
        assert!(cli.sandbox);
        assert_eq!(cli.command, Some(Commands::Status { json: false }));
    }

    #[test]
    fn test_overrides_win_over_file() {
        let cli = Cli::try_parse_from([
            "archivist",
            "sync",
            "--pacing-ms",
            "250",
            "--floor",
            "3500",
            "-d",
            "archive",
        ])
        .unwrap();
        let file = SyncConfig::from_json(r#"{ "pacing_ms": 5000, "data_dir": "elsewhere" }"#).unwrap();
        let command = cli.command.clone().unwrap_or_default();

        let settings = apply_overrides(file, &cli, &command);
        assert_eq!(settings.pacing_ms, 250);
        assert_eq!(settings.default_floor, 3500);
        assert_eq!(settings.data_dir, PathBuf::from("archive"));
        assert!(!settings.sandbox);
    }

    #[test]
    fn test_backfill_arguments() {
        let cli = Cli::try_parse_from(["archivist", "backfill"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Backfill {
                down_to: 1,
                pacing_ms: None
            })
        );

        let cli = Cli::try_parse_from(["archivist", "backfill", "--down-to", "3400", "--pacing-ms", "0"])
            .unwrap();
        let command = cli.command.clone().unwrap_or_default();
        let settings = apply_overrides(SyncConfig::default(), &cli, &command);
        assert_eq!(
            command,
            Commands::Backfill {
                down_to: 3400,
                pacing_ms: Some(0)
            }
        );
        assert_eq!(settings.pacing_ms, 0);
        assert_eq!(settings.default_floor, 0);
    }

    #[test]
    fn test_init_accepts_missing_config_file() {
        let cli = Cli::try_parse_from(["archivist", "init", "-c", "/nonexistent/settings.json"])
            .unwrap();
        let command = cli.command.clone().unwrap_or_default();
        assert_eq!(command, Commands::Init { force: false });
        assert_eq!(load_settings(&cli, &command).unwrap(), SyncConfig::default());

        let cli = Cli::try_parse_from(["archivist", "sync", "-c", "/nonexistent/settings.json"])
            .unwrap();
        let command = cli.command.clone().unwrap_or_default();
        assert!(load_settings(&cli, &command).is_err());
    }

    #[test]
    fn test_file_values_kept_without_flags() {
        let cli = Cli::try_parse_from(["archivist", "notebooks"]).unwrap();
        let file = SyncConfig::from_json(r#"{ "sandbox": true, "pacing_ms": 5000 }"#).unwrap();

        let settings = apply_overrides(file, &cli, &Commands::Notebooks);
        assert!(settings.sandbox);
        assert_eq!(settings.pacing_ms, 5000);
    }
}
