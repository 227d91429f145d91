//! Checkpoint registry
//!
//! Read-side view over the checkpoint namespace: which checkpoint is the
//! newest, and what a given checkpoint record says about itself.

use crate::checkpoint::{CheckpointInfo, CheckpointMessage, CheckpointRef};
use crate::error::Result;
use crate::git::Git;
use tracing::{debug, warn};

/// Lookups over the checkpoint references of one repository
#[derive(Debug, Clone, Copy)]
pub struct Registry<'a> {
    git: &'a Git,
}

impl<'a> Registry<'a> {
    /// Create a registry over `git`
    pub fn new(git: &'a Git) -> Self {
        Self { git }
    }

    /// All checkpoint references, newest first
    pub fn checkpoints(&self) -> Result<Vec<CheckpointRef>> {
        self.git.list_checkpoint_refs()
    }

    /// The reference with the greatest embedded timestamp
    ///
    /// Returns `None` when the namespace is empty.
    pub fn latest(&self) -> Result<Option<CheckpointRef>> {
        let latest = self.checkpoints()?.into_iter().max();
        debug!("Latest checkpoint: {:?}", latest.as_ref().map(CheckpointRef::name));
        Ok(latest)
    }

    /// Decode the record behind `reference`
    ///
    /// Returns `Ok(None)` when the reference does not resolve to a commit or
    /// the commit message has no parsable timestamp: the checkpoint is
    /// corrupted. Engine failures are still reported as errors.
    pub fn info(&self, reference: &CheckpointRef) -> Result<Option<CheckpointInfo>> {
        let Some(commit) = self.git.resolve_commit(reference.name())? else {
            warn!("Checkpoint {} does not point at a commit", reference);
            return Ok(None);
        };

        let raw = self.git.commit_message(&commit)?;
        let Some(message) = CheckpointMessage::parse(&raw) else {
            warn!("Checkpoint {} has no parsable timestamp", reference);
            return Ok(None);
        };

        Ok(Some(CheckpointInfo {
            reference: reference.clone(),
            commit,
            timestamp_ms: message.timestamp_ms,
            operation: message.operation,
        }))
    }
}
