//! CLI argument parsing and command implementations.

pub mod args;
pub mod info;
pub mod output;
pub mod refresh;
pub mod watch;

use std::sync::Arc;

pub use args::{Cli, Commands, OutputFormat};

use crate::core::controller::SyncController;
use crate::core::http::HttpTransport;
use crate::error::{Result, SyncError};
use crate::storage::Config;

/// Controller over the HTTP transport, seeded with `config`.
///
/// # Errors
/// Returns an error if the HTTP client cannot be built.
pub fn build_controller(config: &Config) -> Result<SyncController> {
    let transport = HttpTransport::new(config.sync.api_base.clone(), config.sync.timeout())?;
    SyncController::builder()
        .transport(Arc::new(transport))
        .settings(config.sync_settings())
        .config(config.to_snapshot())
        .build()
}

pub(crate) fn require_account(config: &Config, account_id: &str) -> Result<()> {
    if config.accounts.contains_key(account_id) {
        Ok(())
    } else {
        Err(SyncError::AccountNotFound(account_id.to_string()))
    }
}
