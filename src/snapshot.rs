//! Snapshot capture
//!
//! Turns the current working directory into a published checkpoint:
//!
//! 1. write every file on disk into a tree object (without touching the index),
//! 2. wrap the tree in a checkpoint commit whose parent is the current HEAD,
//! 3. publish a timestamped reference pointing at the commit.
//!
//! Capture runs from Git hooks right before the user's own command, so it has
//! two entry points. [`capture`] is the ordinary fallible operation.
//! [`create_checkpoint`] is the best-effort operation the hooks use: it
//! always returns, never propagates an error, and routes failures only to the
//! `tracing` diagnostic channel, which the binary enables when
//! [`DEBUG_ENV`] is set.
//!
//! ## Examples
//!
//! ```rust,no_run
//! use easegit::git::Git;
//! use easegit::snapshot;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let git = Git::open(".")?;
//! match snapshot::create_checkpoint(&git, "rebase") {
//!     Some(snapshot) => println!("Saved {}", snapshot.reference),
//!     None => {} // nothing to report, the user's command goes ahead
//! }
//! # Ok(())
//! # }
//! ```

use crate::checkpoint::{CheckpointMessage, CheckpointRef};
use crate::error::Result;
use crate::git::{CommitId, Git, TreeId};
use crate::utils;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Environment toggle enabling diagnostics for best-effort capture
pub const DEBUG_ENV: &str = "EASEGIT_DEBUG";

/// A checkpoint that was just captured and published
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Published reference
    pub reference: CheckpointRef,
    /// Checkpoint commit
    pub commit: CommitId,
    /// Tree holding the workspace contents
    pub tree: TreeId,
    /// HEAD at capture time, `None` on an unborn branch
    pub parent: Option<CommitId>,
    /// Embedded metadata
    pub message: CheckpointMessage,
}

/// Capture the workspace and publish it as a checkpoint
///
/// # Errors
///
/// Any engine or filesystem failure. The real index is untouched on every
/// path, including failures.
#[instrument(skip(git))]
pub fn capture(git: &Git, operation: &str, timestamp_ms: i64) -> Result<Snapshot> {
    let start = Instant::now();
    let message = CheckpointMessage::new(operation, timestamp_ms);

    let tree = git.write_workspace_tree()?;
    let record = git.wrap_tree_as_checkpoint(&tree, &message)?;
    let reference = git.publish_checkpoint_ref(&record.id, message.timestamp_ms)?;

    info!(
        "Checkpoint {} before {} in {}ms",
        reference,
        message.operation,
        start.elapsed().as_millis()
    );

    Ok(Snapshot {
        reference,
        commit: record.id,
        tree,
        parent: record.parent,
        message,
    })
}

/// Best-effort checkpoint before `operation`, stamped with the current time
///
/// Never fails. Returns the snapshot when one was published and `None`
/// otherwise; the reason for a `None` is only visible through diagnostics.
pub fn create_checkpoint(git: &Git, operation: &str) -> Option<Snapshot> {
    create_checkpoint_at(git, operation, utils::now_millis())
}

/// Best-effort checkpoint with an explicit timestamp
pub fn create_checkpoint_at(git: &Git, operation: &str, timestamp_ms: i64) -> Option<Snapshot> {
    match capture(git, operation, timestamp_ms) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            warn!("Checkpoint before {} skipped: {}", operation, e);
            None
        }
    }
}

/// Whether the diagnostic channel for best-effort capture is switched on
///
/// Any non-empty value other than `0` enables it.
pub fn diagnostics_enabled() -> bool {
    std::env::var_os(DEBUG_ENV).is_some_and(|value| !value.is_empty() && value != "0")
}
