//! Integration tests for easegit
//!
//! Drives real repositories through the capture and undo cycle the hooks
//! produce: work in progress, a risky operation, then `undo`.

use ::easegit::registry::Registry;
use ::easegit::*;
use anyhow::{ensure, Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use walkdir::WalkDir;

/// A throwaway repository with an easegit handle on it
pub struct RepoHarness {
    pub dir: TempDir,
    pub easegit: EaseGit,
}

impl RepoHarness {
    /// Fresh repository with a local identity and no commits
    pub fn new() -> Result<Self> {
        let dir = TempDir::new()?;
        git_in(dir.path(), &["init", "-q"])?;
        git_in(dir.path(), &["config", "user.name", "EaseGit Test"])?;
        git_in(dir.path(), &["config", "user.email", "test@easegit.local"])?;
        git_in(dir.path(), &["config", "commit.gpgsign", "false"])?;
        let easegit = EaseGit::open(dir.path())?;
        Ok(Self { dir, easegit })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Run git in the repository and return trimmed stdout
    pub fn git(&self, args: &[&str]) -> Result<String> {
        git_in(self.path(), args)
    }

    pub fn write(&self, rel: &str, content: &str) -> Result<()> {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content).with_context(|| format!("writing {}", rel))
    }

    pub fn read(&self, rel: &str) -> Result<String> {
        fs::read_to_string(self.path().join(rel)).with_context(|| format!("reading {}", rel))
    }

    pub fn remove(&self, rel: &str) -> Result<()> {
        fs::remove_file(self.path().join(rel)).with_context(|| format!("removing {}", rel))
    }

    /// Stage everything and commit
    pub fn commit_all(&self, message: &str) -> Result<()> {
        self.git(&["add", "-A"])?;
        self.git(&["commit", "-q", "-m", message])?;
        Ok(())
    }

    /// Every file outside `.git` with its content
    pub fn file_set(&self) -> Result<BTreeMap<PathBuf, Vec<u8>>> {
        let mut files = BTreeMap::new();
        let walker = WalkDir::new(self.path())
            .into_iter()
            .filter_entry(|entry| entry.file_name() != ".git");
        for entry in walker {
            let entry = entry?;
            if entry.file_type().is_file() {
                let rel = entry.path().strip_prefix(self.path())?.to_path_buf();
                files.insert(rel, fs::read(entry.path())?);
            }
        }
        Ok(files)
    }

    pub fn status(&self) -> Result<String> {
        self.git(&["status", "--porcelain"])
    }
}

/// Run git in `dir`, failing on a non-zero exit
pub fn git_in(dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("LC_ALL", "C")
        .output()
        .with_context(|| format!("spawning git {:?}", args))?;
    ensure!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
}

#[test]
fn test_empty_repository_round_trip() -> Result<()> {
    let repo = RepoHarness::new()?;

    let snapshot = repo
        .easegit
        .checkpoint("init-test")
        .context("checkpoint on empty repository")?;
    assert_eq!(snapshot.parent, None);

    let status = repo.easegit.status()?;
    match &status.latest {
        LatestCheckpoint::Available(info) => assert_eq!(info.operation, "init-test"),
        other => panic!("unexpected {:?}", other),
    }

    repo.write("created-later.txt", "later")?;
    let result = repo.easegit.undo()?;

    assert_eq!(result.files_restored, 0);
    assert!(repo.file_set()?.is_empty());
    assert_eq!(repo.status()?, "");
    Ok(())
}

#[test]
fn test_tracked_and_untracked_scenario() -> Result<()> {
    let repo = RepoHarness::new()?;
    repo.write("a.txt", "1")?;
    repo.commit_all("initial")?;
    repo.write("b.txt", "x")?;

    repo.easegit.checkpoint("rebase").context("checkpoint")?;

    repo.write("a.txt", "2")?;
    repo.remove("b.txt")?;
    repo.write("c.txt", "new")?;

    let result = repo.easegit.undo()?;

    assert_eq!(repo.read("a.txt")?, "1");
    assert_eq!(repo.read("b.txt")?, "x");
    assert!(!repo.path().join("c.txt").exists());
    assert_eq!(result.checkpoint.operation, "rebase");
    Ok(())
}

#[test]
fn test_capture_leaves_staging_area_alone() -> Result<()> {
    let repo = RepoHarness::new()?;
    repo.write("tracked.txt", "v1")?;
    repo.write("keep/deleted.txt", "d")?;
    repo.commit_all("initial")?;

    repo.write("tracked.txt", "v2")?;
    repo.write("staged.txt", "s")?;
    repo.git(&["add", "staged.txt"])?;
    repo.write("tracked.txt", "v3")?;
    repo.remove("keep/deleted.txt")?;
    repo.write("untracked/new.txt", "n")?;

    let before = repo.status()?;
    let index = repo.path().join(".git/index");
    let index_bytes = fs::read(&index)?;

    let snapshot = repo.easegit.checkpoint("merge").context("checkpoint")?;

    assert_eq!(fs::read(&index)?, index_bytes);
    assert_eq!(repo.status()?, before);

    let listing = repo.git(&["ls-tree", "-r", "--name-only", snapshot.tree.as_str()])?;
    assert_eq!(listing, "staged.txt\ntracked.txt\nuntracked/new.txt");
    Ok(())
}

#[test]
fn test_undo_after_branch_switch() -> Result<()> {
    let repo = RepoHarness::new()?;
    repo.write("app.txt", "main")?;
    repo.commit_all("initial")?;
    repo.git(&["branch", "feature"])?;
    repo.git(&["checkout", "-q", "feature"])?;
    repo.write("app.txt", "feature")?;
    repo.write("feature-only.txt", "f")?;
    repo.commit_all("feature work")?;
    repo.git(&["checkout", "-q", "-"])?;

    repo.write("scratch.txt", "unsaved thoughts")?;
    let expected = repo.file_set()?;
    repo.easegit.checkpoint("checkout").context("checkpoint")?;

    repo.remove("scratch.txt")?;
    repo.git(&["checkout", "-q", "feature"])?;
    assert_eq!(repo.read("app.txt")?, "feature");

    repo.easegit.undo()?;

    assert_eq!(repo.file_set()?, expected);
    Ok(())
}

#[test]
fn test_newest_checkpoint_wins() -> Result<()> {
    let repo = RepoHarness::new()?;
    let git = repo.easegit.git();

    let captures = [("t2", 2_000, "two"), ("t3", 3_000, "three"), ("t1", 1_000, "one")];
    for (label, stamp, content) in captures {
        repo.write("state.txt", content)?;
        snapshot::capture(git, label, stamp)?;
    }

    let result = repo.easegit.undo()?;
    assert_eq!(result.checkpoint.operation, "t3");
    assert_eq!(repo.read("state.txt")?, "three");

    let refs = Registry::new(git).checkpoints()?;
    let stamps: Vec<i64> = refs.iter().map(CheckpointRef::timestamp_ms).collect();
    assert_eq!(stamps, vec![3_000, 2_000, 1_000]);
    Ok(())
}

#[test]
fn test_numeric_ordering_across_digit_widths() -> Result<()> {
    let repo = RepoHarness::new()?;
    let git = repo.easegit.git();

    repo.write("state.txt", "wide")?;
    snapshot::capture(git, "wide", 10_000)?;
    repo.write("state.txt", "narrow")?;
    snapshot::capture(git, "narrow", 9_999)?;

    let result = repo.easegit.undo()?;
    assert_eq!(result.checkpoint.operation, "wide");
    assert_eq!(repo.read("state.txt")?, "wide");
    Ok(())
}

#[test]
fn test_undo_with_corrupted_latest() -> Result<()> {
    let repo = RepoHarness::new()?;
    repo.write("a.txt", "1")?;
    snapshot::capture(repo.easegit.git(), "merge", 1_000)?;

    let tree = repo.easegit.git().write_workspace_tree()?;
    let commit = repo.git(&["commit-tree", tree.as_str(), "-m", "hand-made record"])?;
    repo.git(&["update-ref", "refs/easegit/checkpoints/2000", &commit])?;

    let err = repo.easegit.undo().unwrap_err();
    assert!(matches!(err, EaseGitError::CorruptedCheckpoint(_)));
    assert!(matches!(
        repo.easegit.status()?.latest,
        LatestCheckpoint::Corrupted(_)
    ));
    Ok(())
}

#[test]
fn test_checkpoint_survives_broken_engine() -> Result<()> {
    let repo = RepoHarness::new()?;
    repo.write("a.txt", "1")?;
    let broken = EaseGit::with_git(
        Git::new(repo.path()).with_program("/nonexistent/easegit-test-git"),
    );

    assert_eq!(broken.checkpoint("push"), None);
    assert!(Registry::new(repo.easegit.git()).checkpoints()?.is_empty());
    assert_eq!(repo.status()?, "?? a.txt");
    Ok(())
}

#[test]
fn test_status_predicates_during_conflict() -> Result<()> {
    let repo = RepoHarness::new()?;
    repo.write("shared.txt", "base\n")?;
    repo.commit_all("base")?;
    repo.git(&["checkout", "-q", "-b", "other"])?;
    repo.write("shared.txt", "other\n")?;
    repo.commit_all("other")?;
    repo.git(&["checkout", "-q", "-"])?;
    repo.write("shared.txt", "mine\n")?;
    repo.commit_all("mine")?;

    let merge = Command::new("git")
        .args(["merge", "-q", "other"])
        .current_dir(repo.path())
        .output()?;
    ensure!(!merge.status.success(), "merge was expected to conflict");

    let status = repo.easegit.status()?;
    assert!(status.unmerged_paths);
    assert!(status.dirty);
    assert!(!status.detached_head);
    Ok(())
}

#[test]
fn test_detached_head_is_reported() -> Result<()> {
    let repo = RepoHarness::new()?;
    repo.write("a.txt", "1")?;
    repo.commit_all("initial")?;
    repo.git(&["checkout", "-q", "--detach"])?;

    let status = repo.easegit.status()?;
    assert!(status.detached_head);
    assert!(!status.dirty);
    Ok(())
}
