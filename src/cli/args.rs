//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::core::service::{DataType, Service};
use crate::storage::ENV_CONFIG;

/// Feed Sync - keep widgets fed with periodically refreshed account data.
#[derive(Parser, Debug)]
#[command(name = "feedsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    // === Global flags ===
    /// Output format
    #[arg(long, value_enum, default_value = "human", global = true)]
    pub format: OutputFormat,

    /// Shorthand for --format json
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file path
    #[arg(long, value_name = "PATH", env = ENV_CONFIG, global = true)]
    pub config: Option<PathBuf>,

    /// Log level
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Emit JSON logs
    #[arg(long, global = true)]
    pub json_output: bool,

    /// Verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Cli {
    /// Resolve the effective output format.
    #[must_use]
    pub const fn effective_format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            self.format
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Register a consumer and print every notification until Ctrl+C
    Watch(WatchArgs),

    /// Fetch one account and service once and print the results
    Refresh(RefreshArgs),

    /// List every data type key
    DataTypes,

    /// Load and validate the config file
    CheckConfig,
}

/// Arguments for the `watch` command.
#[derive(Parser, Debug, Clone)]
pub struct WatchArgs {
    /// Account id from the config file
    #[arg(long, value_name = "ID")]
    pub account: String,

    /// Data type key, e.g. genshin:daily-note (repeatable)
    #[arg(long = "data-type", value_name = "KEY", required = true)]
    pub data_types: Vec<DataType>,

    /// Do not reload the config file when it changes
    #[arg(long)]
    pub no_reload: bool,
}

/// Arguments for the `refresh` command.
#[derive(Parser, Debug, Clone)]
pub struct RefreshArgs {
    /// Account id from the config file
    #[arg(long, value_name = "ID")]
    pub account: String,

    /// Service to refresh (genshin, starrail, zzz)
    #[arg(long, value_parser = Service::from_id)]
    pub service: Service,

    /// Restrict to these data types (default: every type of the service)
    #[arg(long = "data-type", value_name = "KEY")]
    pub data_types: Vec<DataType>,
}

impl RefreshArgs {
    /// Requested data types, defaulting to the whole service.
    ///
    /// # Errors
    /// Returns [`crate::error::SyncError::InvalidDataType`] for a type of another service.
    pub fn resolved_data_types(&self) -> crate::error::Result<Vec<DataType>> {
        if self.data_types.is_empty() {
            return Ok(self.service.data_types().collect());
        }
        if let Some(foreign) = self.data_types.iter().find(|dt| dt.service() != self.service) {
            return Err(crate::error::SyncError::InvalidDataType(format!(
                "{foreign} does not belong to {}",
                self.service
            )));
        }
        Ok(self.data_types.clone())
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// One readable line per notification
    #[default]
    Human,
    /// One JSON object per line
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn watch_parses_repeated_data_types() {
        let cli = Cli::try_parse_from([
            "feedsync",
            "watch",
            "--account",
            "main",
            "--data-type",
            "genshin:daily-note",
            "--data-type",
            "zzz:shiyu-defense",
        ])
        .unwrap();
        let Commands::Watch(args) = cli.command else {
            panic!("expected watch");
        };
        assert_eq!(
            args.data_types,
            vec![DataType::GenshinDailyNote, DataType::ZzzShiyuDefense]
        );
    }

    #[test]
    fn unknown_data_type_is_rejected() {
        let result = Cli::try_parse_from([
            "feedsync",
            "watch",
            "--account",
            "main",
            "--data-type",
            "genshin:nope",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn refresh_rejects_foreign_data_type() {
        let args = RefreshArgs {
            account: "main".to_string(),
            service: Service::Genshin,
            data_types: vec![DataType::StarRailDailyNote],
        };
        assert!(args.resolved_data_types().is_err());

        let all = RefreshArgs {
            data_types: Vec::new(),
            ..args
        };
        assert_eq!(all.resolved_data_types().unwrap().len(), 3);
    }
}
