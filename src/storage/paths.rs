//! Platform config location.

use directories::ProjectDirs;
use std::path::PathBuf;

/// Application paths.
pub struct AppPaths {
    /// Configuration directory.
    pub config: PathBuf,
}

impl AppPaths {
    /// Create paths for the feedsync application.
    #[must_use]
    pub fn new() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("dev", "feedsync", "feedsync") {
            Self {
                config: proj_dirs.config_dir().to_path_buf(),
            }
        } else {
            // Fallback to home directory
            let home = directories::BaseDirs::new()
                .map_or_else(|| PathBuf::from("."), |d| d.home_dir().to_path_buf());
            Self {
                config: home.join(".config/feedsync"),
            }
        }
    }

    /// Path to the TOML config file.
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.config.join("config.toml")
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
