//! Configuration file loading.
//!
//! Loads configuration from:
//! - Linux: `~/.config/feedsync/config.toml`
//! - macOS: `~/Library/Application Support/dev.feedsync.feedsync/config.toml`
//! - Windows: `%APPDATA%/feedsync/feedsync/config/config.toml`
//!
//! ## Environment Variables
//!
//! - `FEEDSYNC_CONFIG`: Override config file path
//! - `FEEDSYNC_POLL_INTERVAL`: Poll interval in seconds
//! - `FEEDSYNC_DEBOUNCE_MS`: Config debounce window in milliseconds

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::core::controller::SyncSettings;
use crate::core::http::DEFAULT_API_BASE;
use crate::core::service::Service;
use crate::core::snapshot::{Account, BadgeLayout, ConfigSnapshot, Credentials, Preferences};
use crate::error::{Result, SyncError};

// =============================================================================
// Environment Variable Names
// =============================================================================

/// Environment variable to override config file path.
pub const ENV_CONFIG: &str = "FEEDSYNC_CONFIG";
/// Environment variable for the poll interval in seconds.
pub const ENV_POLL_INTERVAL: &str = "FEEDSYNC_POLL_INTERVAL";
/// Environment variable for the debounce window in milliseconds.
pub const ENV_DEBOUNCE_MS: &str = "FEEDSYNC_DEBOUNCE_MS";

const MIN_POLL_INTERVAL_SECS: u64 = 30;
const MAX_POLL_INTERVAL_SECS: u64 = 86_400;
const MAX_DEBOUNCE_MS: u64 = 60_000;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub display: DisplayConfig,
    /// Accounts keyed by their configured id.
    pub accounts: BTreeMap<String, AccountConfig>,
}

/// Polling and transport settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub poll_interval_secs: u64,
    pub debounce_ms: u64,
    /// API base URL. Operation paths are appended to it.
    pub api_base: String,
    /// Timeout for network requests in seconds.
    pub timeout_seconds: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 300,
            debounce_ms: 500,
            api_base: DEFAULT_API_BASE.to_string(),
            timeout_seconds: 30,
        }
    }
}

impl SyncConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Display preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub animations: bool,
    pub badge: BadgeLayout,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            animations: true,
            badge: BadgeLayout::default(),
        }
    }
}

/// One `[accounts.<id>]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountConfig {
    #[serde(flatten)]
    pub credentials: Credentials,
    /// Player uid per service.
    #[serde(default)]
    pub uids: BTreeMap<Service, String>,
}

impl Config {
    /// Load configuration from `FEEDSYNC_CONFIG` or the default path, then
    /// apply environment overrides.
    ///
    /// Returns default config if the file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but is invalid, or an override
    /// is not a number.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load configuration from a specific path.
    ///
    /// Returns default config if the file doesn't exist.
    ///
    /// # Errors
    /// Returns an error only if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(?path, "Config file not found, using defaults");
            return Ok(Self::default());
        }

        tracing::debug!(?path, "Loading config file");
        let content = fs::read_to_string(path)?;
        Self::parse(&content, path)
    }

    /// Parse TOML content. `path` is only used in error messages.
    ///
    /// # Errors
    /// Returns [`SyncError::ConfigParse`] for malformed TOML or unknown values.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| SyncError::ConfigParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// The config file path: `FEEDSYNC_CONFIG` if set, otherwise the platform default.
    #[must_use]
    pub fn config_path() -> PathBuf {
        std::env::var(ENV_CONFIG)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map_or_else(|| AppPaths::new().config_file(), PathBuf::from)
    }

    /// Apply `FEEDSYNC_POLL_INTERVAL` and `FEEDSYNC_DEBOUNCE_MS`.
    ///
    /// # Errors
    /// Returns [`SyncError::ConfigInvalid`] when a value is not a number.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(secs) = env_u64(ENV_POLL_INTERVAL)? {
            self.sync.poll_interval_secs = secs;
        }
        if let Some(ms) = env_u64(ENV_DEBOUNCE_MS)? {
            self.sync.debounce_ms = ms;
        }
        Ok(())
    }

    /// Validate configuration values.
    ///
    /// Checks that:
    /// - The poll interval is between 30 seconds and one day
    /// - The debounce window is at most one minute
    /// - The timeout is between 1 and 300 seconds
    /// - The API base is an http(s) URL
    /// - Account uids are numeric
    ///
    /// # Errors
    /// Returns [`SyncError::ConfigInvalid`] for the first offending value.
    pub fn validate(&self) -> Result<()> {
        let sync = &self.sync;
        if !(MIN_POLL_INTERVAL_SECS..=MAX_POLL_INTERVAL_SECS).contains(&sync.poll_interval_secs) {
            return Err(invalid(
                "sync.poll_interval_secs",
                sync.poll_interval_secs,
                format!(
                    "must be between {MIN_POLL_INTERVAL_SECS} and {MAX_POLL_INTERVAL_SECS} seconds"
                ),
            ));
        }
        if sync.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(invalid(
                "sync.debounce_ms",
                sync.debounce_ms,
                format!("must be at most {MAX_DEBOUNCE_MS} ms"),
            ));
        }
        if sync.timeout_seconds == 0 || sync.timeout_seconds > 300 {
            return Err(invalid(
                "sync.timeout_seconds",
                sync.timeout_seconds,
                "must be between 1 and 300 seconds".to_string(),
            ));
        }
        if !(sync.api_base.starts_with("https://") || sync.api_base.starts_with("http://")) {
            return Err(invalid(
                "sync.api_base",
                &sync.api_base,
                "must be an http(s) URL".to_string(),
            ));
        }

        for (id, account) in &self.accounts {
            for (service, uid) in &account.uids {
                if uid.is_empty() || !uid.chars().all(|c| c.is_ascii_digit()) {
                    return Err(invalid(
                        &format!("accounts.{id}.uids.{}", service.id()),
                        uid,
                        "uid must be numeric".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// The snapshot pushed into the sync controller.
    #[must_use]
    pub fn to_snapshot(&self) -> ConfigSnapshot {
        let preferences = Preferences {
            animations_enabled: self.display.animations,
            badge: self.display.badge.clone(),
        };
        self.accounts
            .iter()
            .fold(
                ConfigSnapshot::default().with_preferences(preferences),
                |snapshot, (id, account)| {
                    let mut resolved = Account::new(id.clone(), account.credentials.clone());
                    resolved.uids.clone_from(&account.uids);
                    snapshot.with_account(resolved)
                },
            )
    }

    #[must_use]
    pub const fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            poll_interval: Duration::from_secs(self.sync.poll_interval_secs),
            debounce: Duration::from_millis(self.sync.debounce_ms),
        }
    }
}

fn invalid(key: &str, value: impl ToString, message: String) -> SyncError {
    SyncError::ConfigInvalid {
        key: key.to_string(),
        value: value.to_string(),
        message,
    }
}

fn env_u64(key: &str) -> Result<Option<u64>> {
    let Ok(raw) = std::env::var(key) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse()
        .map(Some)
        .map_err(|_| invalid(key, trimmed, "must be a whole number".to_string()))
}
