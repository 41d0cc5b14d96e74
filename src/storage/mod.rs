//! Configuration storage.

pub mod config;
pub mod paths;

pub use config::{
    AccountConfig, Config, DisplayConfig, ENV_CONFIG, ENV_DEBOUNCE_MS, ENV_POLL_INTERVAL,
    SyncConfig,
};
pub use paths::AppPaths;
