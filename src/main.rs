//! feedsync - Feed Sync
//!
//! CLI entry point.

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use clap::Parser;
use std::process::ExitCode;

use feedsync::cli::{Cli, Commands, info, refresh, watch};
use feedsync::core::logging::{self, LogFormat, LogLevel, LogSettings};
use feedsync::storage::Config;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut log_settings = LogSettings::from_env().with_verbose(cli.verbose);
    if let Some(level) = cli.log_level.as_deref().and_then(LogLevel::from_arg) {
        log_settings.level = level;
    }
    if cli.json_output {
        log_settings.format = LogFormat::Json;
    }
    logging::init(&log_settings);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(code = e.error_code(), "{e}");
            eprintln!("error[{}]: {e}", e.error_code());
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

async fn run(cli: Cli) -> feedsync::Result<()> {
    let format = cli.effective_format();
    let config_path = cli.config.clone().unwrap_or_else(Config::config_path);

    match &cli.command {
        Commands::Watch(args) => watch::run_watch(args, config_path, format).await,
        Commands::Refresh(args) => refresh::run_refresh(args, &config_path, format).await,
        Commands::DataTypes => info::list_data_types(format),
        Commands::CheckConfig => info::check_config(&config_path, format),
    }
}
