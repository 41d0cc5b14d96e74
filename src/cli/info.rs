//! The `data-types` and `check-config` commands.

use std::path::Path;

use serde_json::json;

use super::args::OutputFormat;
use crate::core::config_watcher::reload;
use crate::core::service::{DataType, Service};
use crate::error::Result;

/// Print every data type key, grouped by service.
///
/// # Errors
/// Returns an error if JSON serialization fails.
pub fn list_data_types(format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let keys: Vec<String> = DataType::ALL.iter().map(|dt| dt.key()).collect();
            println!("{}", serde_json::to_string(&keys)?);
        }
        OutputFormat::Human => {
            for service in Service::ALL {
                println!("{}:", service.display_name());
                for data_type in service.data_types() {
                    println!("  {data_type}");
                }
            }
        }
    }
    Ok(())
}

/// Load and validate the config file, then summarize it.
///
/// # Errors
/// Returns the load or validation error.
pub fn check_config(path: &Path, format: OutputFormat) -> Result<()> {
    let config = reload(path)?;
    match format {
        OutputFormat::Json => {
            let accounts: serde_json::Map<String, serde_json::Value> = config
                .accounts
                .iter()
                .map(|(id, account)| {
                    let services: Vec<&str> = account.uids.keys().map(|s| s.id()).collect();
                    (id.clone(), json!({ "services": services }))
                })
                .collect();
            let summary = json!({
                "path": path.display().to_string(),
                "valid": true,
                "pollIntervalSecs": config.sync.poll_interval_secs,
                "debounceMs": config.sync.debounce_ms,
                "accounts": accounts,
            });
            println!("{}", serde_json::to_string(&summary)?);
        }
        OutputFormat::Human => {
            println!("Config OK: {}", path.display());
            println!(
                "Polling every {}s, debounce {}ms",
                config.sync.poll_interval_secs, config.sync.debounce_ms
            );
            if config.accounts.is_empty() {
                println!("No accounts configured.");
            }
            for (id, account) in &config.accounts {
                let services: Vec<&str> = account.uids.keys().map(|s| s.id()).collect();
                println!("  {id}: {}", services.join(", "));
            }
        }
    }
    Ok(())
}
