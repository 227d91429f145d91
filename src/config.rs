//! Installation record
//!
//! `easegit init` writes an [`EaseGitConfig`] to `<git-dir>/easegit/config.json`
//! describing which executable the triggers call and which hooks were
//! installed. `status` reads it back; checkpoint capture never does.

use crate::error::{EaseGitError, Result};
use crate::utils;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory under the git dir holding easegit state
pub const STATE_DIR: &str = "easegit";

/// Configuration file name inside [`STATE_DIR`]
pub const CONFIG_FILE: &str = "config.json";

/// What `init` recorded about the installation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EaseGitConfig {
    /// Version of easegit that wrote the record
    pub version: String,
    /// Directory containing the executable
    pub install_root: PathBuf,
    /// Absolute path the triggers invoke
    pub executable: PathBuf,
    /// When `init` last ran
    pub installed_at: DateTime<Utc>,
    /// Hook names installed by easegit
    pub triggers: Vec<String>,
}

impl EaseGitConfig {
    /// Record for `executable` with the given installed triggers
    pub fn new(executable: impl Into<PathBuf>, triggers: Vec<String>) -> Self {
        let executable = executable.into();
        let install_root = executable
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            install_root,
            executable,
            installed_at: Utc::now(),
            triggers,
        }
    }

    /// Location of the record for a repository metadata directory
    pub fn path(git_dir: &Path) -> PathBuf {
        git_dir.join(STATE_DIR).join(CONFIG_FILE)
    }

    /// Load the record, `None` if `init` never ran
    ///
    /// # Errors
    ///
    /// - [`EaseGitError::Config`] if the file exists but cannot be decoded
    /// - [`EaseGitError::Io`] if the file cannot be read
    pub fn load(git_dir: &Path) -> Result<Option<Self>> {
        let path = Self::path(git_dir);
        let content = match fs::read(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let config = serde_json::from_slice(&content)
            .map_err(|e| EaseGitError::config(format!("{:?}: {}", path, e)))?;
        debug!("Loaded configuration from {:?}", path);
        Ok(Some(config))
    }

    /// Write the record atomically
    pub fn save(&self, git_dir: &Path) -> Result<()> {
        let path = Self::path(git_dir);
        let json = serde_json::to_vec_pretty(self)?;
        utils::atomic_write(&path, &json)?;
        debug!("Saved configuration to {:?}", path);
        Ok(())
    }
}
