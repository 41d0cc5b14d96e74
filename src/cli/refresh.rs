//! The `refresh` command: one out-of-band update, printed.

use std::path::Path;
use std::sync::{Arc, Mutex};

use super::args::{OutputFormat, RefreshArgs};
use super::output::render_notification;
use super::{build_controller, require_account};
use crate::core::config_watcher::reload;
use crate::core::registry::Registration;
use crate::core::scheduler::{RefreshOutcome, SkipReason};
use crate::error::{Result, SyncError};

const CONSUMER_ID: &str = "cli-refresh";

/// Fetch the requested data types once and print each resulting entry.
///
/// # Errors
/// Returns an error if the config is invalid, the account is unknown, or the
/// pair had to be skipped.
pub async fn run_refresh(args: &RefreshArgs, config_path: &Path, format: OutputFormat) -> Result<()> {
    let data_types = args.resolved_data_types()?;
    let config = reload(config_path)?;
    require_account(&config, &args.account)?;

    let controller = build_controller(&config)?;
    let lines: Arc<Mutex<Vec<String>>> = Arc::default();
    let sink = Arc::clone(&lines);
    controller.register(Registration::new(
        CONSUMER_ID,
        args.account.as_str(),
        data_types,
        move |account, data_type, entry| {
            let line = render_notification(format, account, data_type, entry)?;
            sink.lock()
                .map_err(|_| anyhow::anyhow!("output buffer poisoned"))?
                .push(line);
            Ok(())
        },
    ));

    let outcome = controller.request_update(&args.account, args.service).await;
    controller.unregister(CONSUMER_ID);

    match outcome {
        RefreshOutcome::Committed(_) | RefreshOutcome::NoDemand => {}
        RefreshOutcome::Skipped(SkipReason::UnknownAccount) => {
            return Err(SyncError::AccountNotFound(args.account.clone()));
        }
        RefreshOutcome::Skipped(SkipReason::RejectedCredentials) => {
            return Err(SyncError::AuthInvalid {
                account: args.account.clone(),
                reason: "credentials failed validation".to_string(),
            });
        }
        RefreshOutcome::Skipped(reason) => {
            return Err(SyncError::Config(format!(
                "cannot refresh {} for {}: {reason}",
                args.service, args.account
            )));
        }
    }

    let lines = lines
        .lock()
        .map_err(|_| SyncError::Other(anyhow::anyhow!("output buffer poisoned")))?;
    for line in lines.iter() {
        println!("{line}");
    }
    Ok(())
}
