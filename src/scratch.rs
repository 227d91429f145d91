//! Private staging area for snapshot capture
//!
//! A [`ScratchIndex`] is a copy of the repository's index living in a
//! temporary directory under the git directory. Commands that should stage
//! into the copy instead of the real index are run through the handle
//! returned by [`ScratchIndex::redirect`].
//!
//! The copy is removed when the guard is released or dropped, so every exit
//! path out of the capture (including `?` early returns and panics) cleans up.

use crate::error::Result;
use crate::git::Git;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{trace, warn};

/// Prefix of the temporary directory created under the git directory
pub const SCRATCH_PREFIX: &str = "easegit-index-";

/// Scoped copy of the index
#[derive(Debug)]
pub struct ScratchIndex {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl ScratchIndex {
    /// Copy the real index of `git` into a fresh scratch location
    ///
    /// When the repository has no index yet (nothing was ever staged) the
    /// scratch index starts out absent, which git treats as empty.
    pub fn acquire(git: &Git) -> Result<Self> {
        let git_dir = git.git_dir()?;
        let real_index = git.index_path()?;

        let dir = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(&git_dir)?;
        let path = dir.path().join("index");

        if real_index.exists() {
            fs::copy(&real_index, &path)?;
        }
        trace!("Acquired scratch index {:?}", path);

        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    /// Location of the scratch index file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A handle on `git` whose commands stage into this scratch index
    pub fn redirect(&self, git: &Git) -> Git {
        git.with_index_file(&self.path)
    }

    /// Remove the scratch index, reporting cleanup failures
    pub fn release(mut self) -> Result<()> {
        if let Some(dir) = self.dir.take() {
            dir.close()?;
            trace!("Released scratch index {:?}", self.path);
        }
        Ok(())
    }
}

impl Drop for ScratchIndex {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            if let Err(e) = dir.close() {
                warn!("Failed to remove scratch index {:?}: {}", self.path, e);
            }
        }
    }
}
