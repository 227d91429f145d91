//! Error types for the easegit library
//!
//! This module defines every error that can surface from checkpoint capture,
//! lookup and restore. The taxonomy is deliberately small: the four core kinds
//! (`NotARepository`, `EngineCommandFailed`, `NoCheckpointAvailable`,
//! `CorruptedCheckpoint`) cover everything the workflow can report, and a few
//! ambient variants carry I/O and configuration failures from the outer shell.

use std::path::PathBuf;
use thiserror::Error;

/// Type alias for Results in the easegit library
pub type Result<T> = std::result::Result<T, EaseGitError>;

/// Main error type for all easegit operations
#[derive(Debug, Error)]
pub enum EaseGitError {
    /// The path is not inside a Git working tree
    #[error("Not a Git repository: {0:?}")]
    NotARepository(PathBuf),

    /// An invocation of the git engine failed to spawn or exited non-zero
    #[error("Git command failed: git {command}: {cause}")]
    EngineCommandFailed {
        /// The arguments passed to git, space separated
        command: String,
        /// Engine stderr, or the spawn error
        cause: String,
    },

    /// Undo was requested but no checkpoint reference exists
    #[error("No checkpoint found to restore")]
    NoCheckpointAvailable,

    /// A checkpoint reference exists but its record cannot be parsed
    #[error("Checkpoint data is corrupted: {0}")]
    CorruptedCheckpoint(String),

    /// I/O errors during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors during JSON serialization/deserialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Trigger (hook script) installation failed
    #[error("Hook installation failed: {0}")]
    HookInstall(String),

    /// Invalid or unreadable configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EaseGitError {
    /// Create an engine failure for the given git arguments
    pub fn engine<S: AsRef<str>>(args: &[S], cause: impl Into<String>) -> Self {
        EaseGitError::EngineCommandFailed {
            command: args
                .iter()
                .map(|a| a.as_ref())
                .collect::<Vec<_>>()
                .join(" "),
            cause: cause.into(),
        }
    }

    /// Create an internal error with a custom message
    pub fn internal(msg: impl Into<String>) -> Self {
        EaseGitError::Internal(msg.into())
    }

    /// Create a configuration error with a custom message
    pub fn config(msg: impl Into<String>) -> Self {
        EaseGitError::Config(msg.into())
    }

    /// Check if this error indicates a broken safety net rather than a missing one
    pub fn is_corruption(&self) -> bool {
        matches!(self, EaseGitError::CorruptedCheckpoint(_))
    }

    /// Check if this error comes from the environment (engine, filesystem)
    ///
    /// Environmental failures are never retried: running the same command
    /// again immediately would fail the same way.
    pub fn is_environmental(&self) -> bool {
        matches!(
            self,
            EaseGitError::EngineCommandFailed { .. } | EaseGitError::Io(_)
        )
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            EaseGitError::NotARepository(_) => {
                "Not a Git repository. Run this command inside a Git repository.".to_string()
            }
            EaseGitError::NoCheckpointAvailable => {
                "No checkpoint found to restore. Checkpoints are created automatically \
                 before rebase, merge, push and checkout once 'easegit init' has run."
                    .to_string()
            }
            EaseGitError::CorruptedCheckpoint(reference) => {
                format!(
                    "Checkpoint data is corrupted ({}). The latest safety net cannot be \
                     restored; inspect it with 'git show {}'.",
                    reference, reference
                )
            }
            EaseGitError::EngineCommandFailed { command, cause } => {
                format!(
                    "git {} failed: {}. Check that git is installed and the repository is healthy.",
                    command, cause
                )
            }
            _ => self.to_string(),
        }
    }
}
