//! Restore engine
//!
//! Brings the working directory back to the newest checkpoint. The restore is
//! single-shot: it always targets the latest checkpoint, writes every file of
//! the snapshot and deletes every file that was not part of it. Running it
//! twice in a row restores the same tree twice.

use crate::checkpoint::CheckpointInfo;
use crate::error::{EaseGitError, Result};
use crate::git::Git;
use crate::registry::Registry;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, instrument};

/// Outcome of restoring a checkpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreResult {
    /// The checkpoint that was restored
    pub checkpoint: CheckpointInfo,
    /// Number of files written from the snapshot
    pub files_restored: usize,
    /// Files and directories removed because they postdate the snapshot
    pub files_removed: Vec<PathBuf>,
    /// Time taken in milliseconds
    pub duration_ms: u64,
}

/// Restore the working directory to the latest checkpoint
///
/// # Errors
///
/// - [`EaseGitError::NoCheckpointAvailable`] if no checkpoint exists
/// - [`EaseGitError::CorruptedCheckpoint`] if the newest record cannot be decoded
/// - [`EaseGitError::EngineCommandFailed`] if materializing the tree fails
#[instrument(skip(git))]
pub fn restore_latest(git: &Git) -> Result<RestoreResult> {
    let start = Instant::now();
    let registry = Registry::new(git);

    let reference = registry
        .latest()?
        .ok_or(EaseGitError::NoCheckpointAvailable)?;
    let checkpoint = registry
        .info(&reference)?
        .ok_or_else(|| EaseGitError::CorruptedCheckpoint(reference.name().to_string()))?;

    let replaced = git.replace_workspace_with_tree(&checkpoint.commit)?;

    let result = RestoreResult {
        checkpoint,
        files_restored: replaced.files_written,
        files_removed: replaced.removed,
        duration_ms: start.elapsed().as_millis() as u64,
    };

    info!(
        "Restored checkpoint {} ({}) in {}ms ({} files restored, {} removed)",
        result.checkpoint.reference,
        result.checkpoint.operation,
        result.duration_ms,
        result.files_restored,
        result.files_removed.len()
    );

    Ok(result)
}
