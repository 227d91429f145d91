//! # EaseGit - Undo for risky Git operations
//!
//! A safety net for Git workspaces: right before a rebase, merge, push or
//! checkout, the whole working directory (tracked, staged and untracked
//! files) is captured as a checkpoint. A single `undo` later brings the
//! working directory back to the newest checkpoint.
//!
//! ## Overview
//!
//! Checkpoints live inside the repository itself, as ordinary Git objects:
//!
//! - the workspace contents become a **tree** object, written through a
//!   private copy of the index so the user's staging area is never touched,
//! - the tree is wrapped in a **commit** whose parent is the current HEAD and
//!   whose message records the guarded operation and the capture time,
//! - a **reference** `refs/easegit/checkpoints/<epoch-millis>` publishes it.
//!
//! Nothing is ever written to the user's branches, and the checkpoint
//! namespace is only ever read to find the newest entry.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use easegit::EaseGit;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let easegit = EaseGit::open(".")?;
//!
//! // Install the Git hooks that take checkpoints automatically
//! easegit.init(Path::new("/usr/local/bin/easegit"))?;
//!
//! // Or take one by hand; this never fails
//! if let Some(snapshot) = easegit.checkpoint("rebase") {
//!     println!("Saved {}", snapshot.reference);
//! }
//!
//! // Bring the workspace back
//! let result = easegit.undo()?;
//! println!(
//!     "Restored checkpoint before {} ({} files)",
//!     result.checkpoint.operation, result.files_restored
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Fallible operations return `Result<T, EaseGitError>`. Checkpoint capture
//! from the hooks goes through [`snapshot::create_checkpoint`], which never
//! fails: a checkpoint that cannot be taken must not block the user's Git
//! command. Its failures are reported on the `tracing` diagnostic channel.
//!
//! ## Module Organization
//!
//! - [`git`]: Object store adapter over the `git` executable
//! - [`scratch`]: Private staging area used during capture
//! - [`checkpoint`]: Reference naming and record format
//! - [`registry`]: Finding and decoding checkpoints
//! - [`snapshot`]: Capturing the workspace
//! - [`restore`]: Restoring the latest checkpoint
//! - [`hooks`]: Trigger installation
//! - [`config`]: Installation record
//! - [`error`]: Error types and handling

// Public API modules
pub mod checkpoint;
pub mod config;
pub mod easegit;
pub mod error;
pub mod git;
pub mod hooks;
pub mod registry;
pub mod restore;
pub mod scratch;
pub mod snapshot;

// Internal modules (not part of public API)
mod utils;

// Re-export main types for convenience
pub use checkpoint::{CheckpointInfo, CheckpointMessage, CheckpointRef};
pub use config::EaseGitConfig;
pub use easegit::{EaseGit, InitReport, LatestCheckpoint, StatusReport};
pub use error::{EaseGitError, Result};
pub use git::{CommitId, Git, TreeId};
pub use restore::RestoreResult;
pub use snapshot::Snapshot;
