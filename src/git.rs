//! Git object store adapter
//!
//! This module wraps the primitive Git operations the checkpoint workflow is
//! built from: writing tree and commit objects, creating and enumerating
//! references, materializing a tree into the working directory, and a few
//! status predicates. Every operation shells out to the `git` executable and
//! blocks until it finishes.
//!
//! ## Failure Semantics
//!
//! Any invocation that cannot be spawned or exits with a failure status is
//! reported as [`EaseGitError::EngineCommandFailed`] carrying the arguments
//! and the engine's stderr. Nothing is retried.
//!
//! ## Staging Area Isolation
//!
//! [`Git::write_workspace_tree`] never touches the user's index. It copies the
//! index into a [`ScratchIndex`] and runs `add`/`write-tree` through a handle
//! whose child processes see `GIT_INDEX_FILE` pointing at that copy. The
//! redirection lives on the child process environment only; the parent
//! process environment is never modified.
//!
//! ## Examples
//!
//! ```rust,no_run
//! use easegit::git::Git;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let git = Git::open(".")?;
//! let tree = git.write_workspace_tree()?;
//! println!("Workspace tree: {}", tree);
//! # Ok(())
//! # }
//! ```

use crate::checkpoint::{CheckpointMessage, CheckpointRef, REF_PREFIX};
use crate::error::{EaseGitError, Result};
use crate::scratch::ScratchIndex;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tracing::{debug, instrument, trace, warn};

/// Porcelain status pairs that mark an unmerged path
const UNMERGED_PAIRS: [&str; 7] = ["DD", "AU", "UD", "UA", "DU", "AA", "UU"];

/// Upper bound on same-millisecond suffixes tried when publishing a reference
const MAX_REF_SEQUENCE: u32 = 1000;

/// Identifier of a tree object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TreeId(String);

/// Identifier of a commit object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommitId(String);

macro_rules! object_id {
    ($ty:ident) => {
        impl $ty {
            /// Wrap a hex object name
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Full hex object name
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// First eight characters of the object name
            pub fn short(&self) -> &str {
                &self.0[..8.min(self.0.len())]
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

object_id!(TreeId);
object_id!(CommitId);

/// A checkpoint commit together with the history tip it was recorded on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointRecord {
    /// The checkpoint commit
    pub id: CommitId,
    /// HEAD at capture time, `None` on an unborn branch
    pub parent: Option<CommitId>,
}

/// What [`Git::replace_workspace_with_tree`] changed on disk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceReplacement {
    /// Number of files written from the target tree
    pub files_written: usize,
    /// Paths removed because they do not belong to the target tree
    pub removed: Vec<PathBuf>,
}

/// Handle on a Git working tree
///
/// A `Git` value is cheap to clone. [`Git::new`] does not validate anything;
/// use [`Git::open`] (or [`Git::discover`]) to resolve and check the
/// repository root.
#[derive(Debug, Clone)]
pub struct Git {
    /// Directory every command runs in
    workdir: PathBuf,
    /// The engine executable
    program: OsString,
    /// Alternate index passed to child processes
    index_file: Option<PathBuf>,
}

impl Git {
    /// Create a handle running commands in `workdir` without validation
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            program: OsString::from("git"),
            index_file: None,
        }
    }

    /// Open the repository containing `path`
    ///
    /// The returned handle runs every command from the top of the working
    /// tree.
    ///
    /// # Errors
    ///
    /// - [`EaseGitError::NotARepository`] if `path` is not inside a working tree
    /// - [`EaseGitError::EngineCommandFailed`] if git cannot be executed
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Git::new(path.as_ref()).discover()
    }

    /// Resolve the repository root and re-anchor this handle on it
    pub fn discover(self) -> Result<Self> {
        let root = self.repo_root()?;
        debug!("Opened repository at {:?}", root);
        Ok(Self {
            workdir: root,
            ..self
        })
    }

    /// Use a different engine executable
    pub fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    /// Handle whose child processes use `index` as their staging area
    pub(crate) fn with_index_file(&self, index: &Path) -> Self {
        Self {
            index_file: Some(index.to_path_buf()),
            ..self.clone()
        }
    }

    /// Directory commands run in
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn command<S: AsRef<str>>(&self, args: &[S]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(args.iter().map(|a| a.as_ref()))
            .current_dir(&self.workdir)
            .env("LC_ALL", "C")
            .stdin(Stdio::null());
        if let Some(index) = &self.index_file {
            cmd.env("GIT_INDEX_FILE", index);
        }
        cmd
    }

    fn output<S: AsRef<str>>(&self, args: &[S]) -> Result<Output> {
        trace!(
            "git {}",
            args.iter().map(|a| a.as_ref()).collect::<Vec<_>>().join(" ")
        );
        self.command(args)
            .output()
            .map_err(|e| EaseGitError::engine(args, e.to_string()))
    }

    /// Run a command and return its trimmed stdout
    pub(crate) fn run<S: AsRef<str>>(&self, args: &[S]) -> Result<String> {
        let output = self.output(args)?;
        if !output.status.success() {
            return Err(failure(args, &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
    }

    /// Run a command whose exit status 1 means "no" rather than failure
    fn try_run<S: AsRef<str>>(&self, args: &[S]) -> Result<Option<String>> {
        let output = self.output(args)?;
        match output.status.code() {
            Some(0) => Ok(Some(
                String::from_utf8_lossy(&output.stdout).trim_end().to_string(),
            )),
            Some(1) => Ok(None),
            _ => Err(failure(args, &output)),
        }
    }

    /// Run a location query, mapping a refusal to `NotARepository`
    fn locate(&self, args: &[&str]) -> Result<String> {
        let output = self.output(args)?;
        if !output.status.success() {
            return Err(EaseGitError::NotARepository(self.workdir.clone()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
    }

    fn absolutize(&self, path: String) -> PathBuf {
        let path = PathBuf::from(path);
        if path.is_absolute() {
            path
        } else {
            self.workdir.join(path)
        }
    }

    /// Check whether the working directory is inside a Git working tree
    pub fn is_repository(&self) -> bool {
        matches!(
            self.run(&["rev-parse", "--is-inside-work-tree"]).as_deref(),
            Ok("true")
        )
    }

    /// Absolute path of the repository metadata directory (`.git`)
    pub fn git_dir(&self) -> Result<PathBuf> {
        self.locate(&["rev-parse", "--absolute-git-dir"]).map(PathBuf::from)
    }

    /// Absolute path of the top of the working tree
    pub fn repo_root(&self) -> Result<PathBuf> {
        self.locate(&["rev-parse", "--show-toplevel"]).map(PathBuf::from)
    }

    /// Location of the real index file
    ///
    /// Honors an inherited `GIT_INDEX_FILE`, as git itself does.
    pub fn index_path(&self) -> Result<PathBuf> {
        let path = self.locate(&["rev-parse", "--git-path", "index"])?;
        Ok(self.absolutize(path))
    }

    /// Directory hooks are read from (honors `core.hooksPath`)
    pub fn hooks_dir(&self) -> Result<PathBuf> {
        let path = self.locate(&["rev-parse", "--git-path", "hooks"])?;
        Ok(self.absolutize(path))
    }

    /// Current history tip, `None` on an unborn branch
    pub fn head(&self) -> Result<Option<CommitId>> {
        self.resolve_commit("HEAD")
    }

    /// Resolve a revision to a commit, `None` if it does not name one
    pub fn resolve_commit(&self, revision: &str) -> Result<Option<CommitId>> {
        let rev = format!("{}^{{commit}}", revision);
        Ok(self
            .try_run(&["rev-parse", "--verify", "-q", rev.as_str()])?
            .map(CommitId))
    }

    /// Tree wrapped by a commit
    pub fn tree_of(&self, commit: &CommitId) -> Result<TreeId> {
        let rev = format!("{}^{{tree}}", commit);
        Ok(TreeId(self.run(&["rev-parse", "--verify", rev.as_str()])?))
    }

    /// First parent of a commit, if any
    pub fn parent_of(&self, commit: &CommitId) -> Result<Option<CommitId>> {
        let rev = format!("{}^1", commit);
        Ok(self
            .try_run(&["rev-parse", "--verify", "-q", rev.as_str()])?
            .map(CommitId))
    }

    /// Write every file on disk into a new tree object
    ///
    /// Tracked, staged and untracked files are all included; ignored files
    /// are not. The real index is left byte-for-byte as it was, on success
    /// and on every failure path: all staging happens in a [`ScratchIndex`]
    /// that is removed when this function returns.
    #[instrument(skip(self))]
    pub fn write_workspace_tree(&self) -> Result<TreeId> {
        let git = self.rooted()?;
        let scratch = ScratchIndex::acquire(&git)?;
        let staged = scratch.redirect(&git);

        staged.run(&["add", "-A"])?;
        let tree = TreeId(staged.run(&["write-tree"])?);

        scratch.release()?;
        debug!("Wrote workspace tree {}", tree.short());
        Ok(tree)
    }

    /// Create a checkpoint commit for `tree`
    ///
    /// The current HEAD becomes the parent when one exists; on an unborn
    /// branch the commit is parentless.
    #[instrument(skip(self, tree, message), fields(tree = %tree.short()))]
    pub fn wrap_tree_as_checkpoint(
        &self,
        tree: &TreeId,
        message: &CheckpointMessage,
    ) -> Result<CheckpointRecord> {
        let parent = self.head()?;
        let subject = message.subject();
        let body = message.body();

        let mut args = vec!["commit-tree", tree.as_str()];
        if let Some(parent) = &parent {
            args.extend(["-p", parent.as_str()]);
        }
        args.extend(["-m", subject.as_str(), "-m", body.as_str()]);

        let id = CommitId(self.run(args.as_slice())?);
        debug!(
            "Created checkpoint commit {} (parent: {:?})",
            id.short(),
            parent.as_ref().map(CommitId::short)
        );
        Ok(CheckpointRecord { id, parent })
    }

    /// Publish a new checkpoint reference pointing at `commit`
    ///
    /// The reference is named after `timestamp_ms`. If that name is taken (two
    /// checkpoints in the same millisecond) a `-1`, `-2`, ... suffix is added.
    /// Creation is create-only, so an existing reference is never overwritten.
    #[instrument(skip(self, commit), fields(commit = %commit.short()))]
    pub fn publish_checkpoint_ref(
        &self,
        commit: &CommitId,
        timestamp_ms: i64,
    ) -> Result<CheckpointRef> {
        for sequence in 0..MAX_REF_SEQUENCE {
            let reference = CheckpointRef::new(timestamp_ms, sequence);
            let taken = self
                .try_run(&["show-ref", "--verify", "--quiet", reference.name()])?
                .is_some();
            if taken {
                trace!("Reference {} already exists", reference);
                continue;
            }

            self.run(&["update-ref", reference.name(), commit.as_str(), ""])?;
            debug!("Published {}", reference);
            return Ok(reference);
        }

        Err(EaseGitError::internal(format!(
            "no free checkpoint reference name for timestamp {}",
            timestamp_ms
        )))
    }

    /// All checkpoint references, newest first
    ///
    /// References in the namespace whose names carry no timestamp are
    /// skipped.
    pub fn list_checkpoint_refs(&self) -> Result<Vec<CheckpointRef>> {
        let listing = self.run(&["for-each-ref", "--format=%(refname)", REF_PREFIX])?;

        let mut refs: Vec<CheckpointRef> = listing
            .lines()
            .filter(|line| !line.is_empty())
            .filter_map(|name| {
                let parsed = CheckpointRef::parse(name);
                if parsed.is_none() {
                    debug!("Ignoring unrecognized reference {}", name);
                }
                parsed
            })
            .collect();

        refs.sort_by(|a, b| b.cmp(a));
        Ok(refs)
    }

    /// Raw message of a commit
    pub fn commit_message(&self, commit: &CommitId) -> Result<String> {
        self.run(&["log", "-1", "--format=%B", commit.as_str()])
    }

    /// Replace the working directory with the contents of `commit`'s tree
    ///
    /// Destructive. The sequence is:
    ///
    /// 1. load the target tree into the index,
    /// 2. remove every untracked file and directory (anything not in the
    ///    target tree; ignored files are kept),
    /// 3. write every index entry to disk, overwriting local modifications,
    /// 4. reset the index to HEAD (or empty it on an unborn branch) so the
    ///    staging area matches what the user had staged relative to HEAD.
    ///
    /// The sequence is not transactional. If step 2 or 3 fails the working
    /// directory may be partly replaced, but step 4 still runs so the index
    /// never keeps the snapshot tree.
    #[instrument(skip(self, commit), fields(commit = %commit.short()))]
    pub fn replace_workspace_with_tree(&self, commit: &CommitId) -> Result<WorkspaceReplacement> {
        let git = self.rooted()?;
        let tree = git.tree_of(commit)?;

        git.run(&["read-tree", tree.as_str()])?;

        let replaced = git.materialize_index(&tree);
        if let Err(e) = git.reset_index() {
            if replaced.is_ok() {
                return Err(e);
            }
            warn!("Index left on the checkpoint tree: {}", e);
        }
        let replaced = replaced?;

        debug!(
            "Materialized tree {} ({} files written, {} removed)",
            tree.short(),
            replaced.files_written,
            replaced.removed.len()
        );
        Ok(replaced)
    }

    /// Make the working directory match the index loaded from `tree`
    fn materialize_index(&self, tree: &TreeId) -> Result<WorkspaceReplacement> {
        // git clean quotes unusual names even with core.quotePath off
        let removed: Vec<PathBuf> = self
            .run(&["ls-files", "-z", "--others", "--exclude-standard", "--directory"])?
            .split('\0')
            .filter(|name| !name.is_empty())
            .map(PathBuf::from)
            .collect();
        self.run(&["clean", "-f", "-d"])?;

        self.run(&["checkout-index", "-f", "-a"])?;

        let files_written = self
            .run(&["ls-tree", "-r", "-z", "--name-only", tree.as_str()])?
            .split('\0')
            .filter(|name| !name.is_empty())
            .count();

        Ok(WorkspaceReplacement {
            files_written,
            removed,
        })
    }

    /// Point the index back at HEAD, or empty it on an unborn branch
    fn reset_index(&self) -> Result<()> {
        if self.head()?.is_some() {
            self.run(&["reset", "-q", "--mixed"])?;
        } else {
            self.run(&["read-tree", "--empty"])?;
        }
        Ok(())
    }

    /// Check for paths with unresolved merge conflicts
    pub fn has_unmerged_paths(&self) -> Result<bool> {
        Ok(self
            .porcelain_status()?
            .lines()
            .any(|line| line.get(..2).is_some_and(|pair| UNMERGED_PAIRS.contains(&pair))))
    }

    /// Check whether HEAD points directly at a commit instead of a branch
    pub fn is_detached_head(&self) -> Result<bool> {
        Ok(self.try_run(&["symbolic-ref", "-q", "HEAD"])?.is_none())
    }

    /// Check for staged, unstaged or untracked changes
    pub fn is_dirty(&self) -> Result<bool> {
        Ok(!self.porcelain_status()?.is_empty())
    }

    fn porcelain_status(&self) -> Result<String> {
        self.run(&["status", "--porcelain"])
    }

    /// Handle anchored on the top of the working tree
    fn rooted(&self) -> Result<Self> {
        Ok(Self {
            workdir: self.repo_root()?,
            ..self.clone()
        })
    }
}

fn failure<S: AsRef<str>>(args: &[S], output: &Output) -> EaseGitError {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let cause = if stderr.is_empty() {
        format!("exited with {}", output.status)
    } else {
        stderr
    };
    EaseGitError::engine(args, cause)
}
