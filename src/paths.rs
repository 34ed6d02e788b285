//! Per-user configuration paths.
//!
//! Profiles live in a single `profiles.yaml` inside a hidden application
//! folder under the platform config directory:
//!
//! - Windows: `%APPDATA%\.midi-binder`
//! - macOS: `~/Library/Application Support/.midi-binder`
//! - Linux: `$XDG_CONFIG_HOME/.midi-binder` (usually `~/.config`)
//!
//! An explicit directory (CLI flag or `MIDI_BINDER_CONFIG_DIR`) replaces the
//! platform folder entirely.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Application folder name below the platform config directory
const APP_DIR_NAME: &str = ".midi-binder";

/// File holding every stored device profile
pub const PROFILES_FILE_NAME: &str = "profiles.yaml";

/// Resolved application paths
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory holding the profiles file
    pub config_dir: PathBuf,
    /// Path to the profiles file
    pub profiles: PathBuf,
}

impl AppPaths {
    /// Resolve paths, preferring `override_dir` when given.
    ///
    /// Falls back to the home directory, then the working directory, when
    /// the platform has no config directory.
    pub fn detect(override_dir: Option<&Path>) -> Self {
        let config_dir = match override_dir {
            Some(dir) => dir.to_path_buf(),
            None => dirs::config_dir()
                .or_else(dirs::home_dir)
                .unwrap_or_else(|| PathBuf::from("."))
                .join(APP_DIR_NAME),
        };

        Self::in_dir(config_dir)
    }

    /// Paths rooted at `config_dir`
    pub fn in_dir(config_dir: impl Into<PathBuf>) -> Self {
        let config_dir = config_dir.into();
        Self {
            profiles: config_dir.join(PROFILES_FILE_NAME),
            config_dir,
        }
    }

    /// Create the config directory and an empty profiles file if missing.
    pub fn ensure_exists(&self) -> Result<()> {
        if !self.config_dir.exists() {
            debug!("Creating config directory: {}", self.config_dir.display());
            std::fs::create_dir_all(&self.config_dir)
                .map_err(|e| Error::io(&self.config_dir, e))?;
        }

        if !self.profiles.exists() {
            OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&self.profiles)
                .map_err(|e| Error::io(&self.profiles, e))?;
            info!("Created profiles file {}", self.profiles.display());
        }

        Ok(())
    }
}
