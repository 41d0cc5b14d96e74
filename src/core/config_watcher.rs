//! Config file hot reload.
//!
//! Watches the directory holding the config file (editors often replace the
//! file rather than write it in place) and hands every successfully reloaded
//! and validated [`Config`] to a callback. Invalid files are logged and
//! ignored; the last good configuration stays in effect.

use std::io;
use std::path::{Path, PathBuf};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{Result, SyncError};
use crate::storage::Config;

/// Load, apply env overrides and validate.
///
/// # Errors
/// Returns the first load, override or validation failure.
pub fn reload(path: &Path) -> Result<Config> {
    checked(Config::load_from(path)?)
}

fn checked(mut config: Config) -> Result<Config> {
    config.apply_env_overrides()?;
    config.validate()?;
    Ok(config)
}

/// Whether a filesystem event concerns `file`.
fn touches(event: &Event, file: &Path) -> bool {
    let relevant = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    );
    relevant
        && event
            .paths
            .iter()
            .any(|p| p.file_name().is_some() && p.file_name() == file.file_name())
}

/// Config to hand on for `event`, if any.
///
/// A missing file (deleted, or renamed away mid-save) or a still-empty one
/// keeps the last good configuration instead of falling back to defaults.
fn reload_for(event: &Event, file: &Path) -> Option<Config> {
    if !touches(event, file) {
        return None;
    }
    let content = match std::fs::read_to_string(file) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %file.display(), "Config file missing, keeping last good config");
            return None;
        }
        Err(e) => {
            tracing::warn!(path = %file.display(), error = %e, "Cannot read config file");
            return None;
        }
    };
    if content.trim().is_empty() {
        tracing::debug!(path = %file.display(), "Config file empty, waiting for the write to finish");
        return None;
    }
    match Config::parse(&content, file).and_then(checked) {
        Ok(config) => {
            tracing::info!(path = %file.display(), accounts = config.accounts.len(), "Config reloaded");
            Some(config)
        }
        Err(e) => {
            tracing::warn!(path = %file.display(), code = e.error_code(), error = %e, "Ignoring invalid config");
            None
        }
    }
}

/// Running watcher. Dropping it stops watching.
pub struct ConfigFileWatcher {
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
    path: PathBuf,
}

impl ConfigFileWatcher {
    /// Start watching `path`; `on_reload` runs on `handle` for every good reload.
    ///
    /// # Errors
    /// Returns an error if the platform watcher cannot be created or attached.
    pub fn start<F>(path: PathBuf, handle: &Handle, on_reload: F) -> Result<Self>
    where
        F: Fn(Config) + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                if tx.send(res).is_err() {
                    tracing::trace!("Config watcher receiver gone");
                }
            },
            notify::Config::default(),
        )
        .map_err(|e| SyncError::Other(anyhow::anyhow!("create config watcher: {e}")))?;

        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| SyncError::Other(anyhow::anyhow!("watch {}: {e}", dir.display())))?;

        let file = path.clone();
        let task = handle.spawn(async move {
            while let Some(res) = rx.recv().await {
                match res {
                    Ok(event) => {
                        if let Some(config) = reload_for(&event, &file) {
                            on_reload(config);
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "Config watch error"),
                }
            }
        });

        tracing::debug!(path = %path.display(), "Watching config file");
        Ok(Self {
            _watcher: watcher,
            task,
            path,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ConfigFileWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}
