//! Main EaseGit implementation
//!
//! The [`EaseGit`] struct is the entry point the command-line front end uses.
//! It ties together the object store adapter, the checkpoint registry, the
//! snapshot and restore engines and the trigger installer.
//!
//! ## Examples
//!
//! ```rust,no_run
//! use easegit::EaseGit;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let easegit = EaseGit::open(".")?;
//!
//! // Taken automatically by the hooks before rebase, merge, push and checkout
//! easegit.checkpoint("rebase");
//!
//! // ... the rebase goes wrong ...
//!
//! let result = easegit.undo()?;
//! println!("Restored {} files", result.files_restored);
//! # Ok(())
//! # }
//! ```

use crate::checkpoint::{CheckpointInfo, CheckpointRef};
use crate::config::EaseGitConfig;
use crate::error::{EaseGitError, Result};
use crate::git::Git;
use crate::hooks::{self, InstallReport};
use crate::registry::Registry;
use crate::restore::{self, RestoreResult};
use crate::snapshot::{self, Snapshot};
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// Handle on one repository's safety net
#[derive(Debug, Clone)]
pub struct EaseGit {
    git: Git,
}

/// The newest checkpoint, as far as `status` can tell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LatestCheckpoint {
    /// The namespace is empty
    None,
    /// The newest reference exists but its record cannot be decoded
    Corrupted(CheckpointRef),
    /// The newest checkpoint, ready to restore
    Available(CheckpointInfo),
}

impl LatestCheckpoint {
    /// Whether `undo` would succeed
    pub fn is_available(&self) -> bool {
        matches!(self, LatestCheckpoint::Available(_))
    }
}

/// Snapshot of the safety net and the working tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    /// Top of the working tree
    pub root: PathBuf,
    /// Newest checkpoint
    pub latest: LatestCheckpoint,
    /// Number of checkpoint references
    pub checkpoint_count: usize,
    /// Staged, unstaged or untracked changes present
    pub dirty: bool,
    /// HEAD is detached
    pub detached_head: bool,
    /// Unresolved merge conflicts present
    pub unmerged_paths: bool,
    /// Hooks currently managed by easegit
    pub installed_triggers: Vec<PathBuf>,
    /// What `init` recorded, if it ran
    pub config: Option<EaseGitConfig>,
}

/// Outcome of `init`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitReport {
    /// Directory the hooks were written to
    pub hooks_dir: PathBuf,
    /// Installed and skipped hooks
    pub hooks: InstallReport,
    /// The record written to the git dir
    pub config: EaseGitConfig,
}

impl EaseGit {
    /// Open the repository containing `path`
    ///
    /// # Errors
    ///
    /// - [`EaseGitError::NotARepository`] if `path` is outside a working tree
    /// - [`EaseGitError::EngineCommandFailed`] if git cannot be executed
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::with_git(Git::open(path)?))
    }

    /// Wrap an existing adapter handle
    pub fn with_git(git: Git) -> Self {
        Self { git }
    }

    /// The underlying adapter
    pub fn git(&self) -> &Git {
        &self.git
    }

    /// Top of the working tree
    pub fn root(&self) -> &Path {
        self.git.workdir()
    }

    /// Best-effort checkpoint before `operation`
    ///
    /// Never fails; see [`snapshot::create_checkpoint`].
    pub fn checkpoint(&self, operation: &str) -> Option<Snapshot> {
        snapshot::create_checkpoint(&self.git, operation)
    }

    /// Restore the working directory to the latest checkpoint
    pub fn undo(&self) -> Result<RestoreResult> {
        restore::restore_latest(&self.git)
    }

    /// Report the safety net and working tree state
    #[instrument(skip(self))]
    pub fn status(&self) -> Result<StatusReport> {
        let registry = Registry::new(&self.git);
        let checkpoints = registry.checkpoints()?;

        let latest = match checkpoints.iter().max() {
            None => LatestCheckpoint::None,
            Some(reference) => match registry.info(reference)? {
                Some(info) => LatestCheckpoint::Available(info),
                None => LatestCheckpoint::Corrupted(reference.clone()),
            },
        };

        let git_dir = self.git.git_dir()?;
        Ok(StatusReport {
            root: self.root().to_path_buf(),
            latest,
            checkpoint_count: checkpoints.len(),
            dirty: self.git.is_dirty()?,
            detached_head: self.git.is_detached_head()?,
            unmerged_paths: self.git.has_unmerged_paths()?,
            installed_triggers: hooks::installed(&self.git.hooks_dir()?),
            config: load_config(&git_dir),
        })
    }

    /// Install the triggers invoking `executable` and record the installation
    ///
    /// Safe to run repeatedly.
    #[instrument(skip(self))]
    pub fn init(&self, executable: &Path) -> Result<InitReport> {
        if !executable.is_absolute() {
            return Err(EaseGitError::config(format!(
                "executable path must be absolute: {:?}",
                executable
            )));
        }

        let hooks_dir = self.git.hooks_dir()?;
        let report = hooks::install(&hooks_dir, executable)?;

        let config = EaseGitConfig::new(executable, report.installed.clone());
        config.save(&self.git.git_dir()?)?;

        info!(
            "Initialized easegit in {:?} ({} triggers)",
            self.root(),
            report.installed.len()
        );
        Ok(InitReport {
            hooks_dir,
            hooks: report,
            config,
        })
    }
}

/// Installation record for status output; unreadable records are reported as absent
fn load_config(git_dir: &Path) -> Option<EaseGitConfig> {
    EaseGitConfig::load(git_dir).unwrap_or_else(|e| {
        warn!("Ignoring unreadable configuration: {}", e);
        None
    })
}
