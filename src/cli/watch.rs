//! The `watch` command.
//!
//! Registers a single consumer, prints every notification it receives and
//! follows config file edits until Ctrl+C.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::runtime::Handle;

use super::args::{OutputFormat, WatchArgs};
use super::output::render_notification;
use super::{build_controller, require_account};
use crate::core::config_watcher::{ConfigFileWatcher, reload};
use crate::core::registry::Registration;
use crate::error::Result;

const CONSUMER_ID: &str = "cli-watch";

/// Run watch mode.
///
/// # Errors
/// Returns an error if the config is invalid, the account is unknown, or the
/// controller cannot start.
pub async fn run_watch(args: &WatchArgs, config_path: PathBuf, format: OutputFormat) -> Result<()> {
    let config = reload(&config_path)?;
    require_account(&config, &args.account)?;

    let controller = Arc::new(build_controller(&config)?);
    controller.init()?;
    controller.register(Registration::new(
        CONSUMER_ID,
        args.account.as_str(),
        args.data_types.clone(),
        move |account, data_type, entry| {
            println!("{}", render_notification(format, account, data_type, entry)?);
            Ok(())
        },
    ));

    let _watcher = if args.no_reload {
        None
    } else {
        let target = Arc::clone(&controller);
        Some(ConfigFileWatcher::start(
            config_path,
            &Handle::current(),
            move |config| target.push_config(config.to_snapshot()),
        )?)
    };

    tokio::signal::ctrl_c().await?;
    controller.unregister(CONSUMER_ID);
    controller.shutdown();
    Ok(())
}
