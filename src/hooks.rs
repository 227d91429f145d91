//! Trigger installation
//!
//! easegit takes checkpoints from Git hooks. Each trigger maps a hook to the
//! operation label recorded in the checkpoint:
//!
//! | hook               | label      |
//! |--------------------|------------|
//! | `pre-rebase`       | `rebase`   |
//! | `pre-merge-commit` | `merge`    |
//! | `pre-push`         | `push`     |
//! | `post-checkout`    | `checkout` |
//!
//! The installed scripts call `easegit checkpoint <label>` and always exit 0,
//! so a failed checkpoint can never abort the user's command.
//!
//! `git rebase` checks out the new base internally, which fires
//! `post-checkout`. That script stays quiet while a rebase is in progress so
//! the checkpoint taken by `pre-rebase` remains the latest one.

use crate::error::{EaseGitError, Result};
use crate::utils;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Marker line identifying scripts written by easegit
pub const HOOK_MARKER: &str = "# Installed by easegit";

/// A hook and the operation label it records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trigger {
    /// Git hook file name
    pub hook: &'static str,
    /// Operation label passed to the checkpoint
    pub operation: &'static str,
    /// Stay quiet while a rebase is in progress
    pub skip_during_rebase: bool,
}

/// Every trigger `init` installs
pub const TRIGGERS: [Trigger; 4] = [
    Trigger {
        hook: "pre-rebase",
        operation: "rebase",
        skip_during_rebase: false,
    },
    Trigger {
        hook: "pre-merge-commit",
        operation: "merge",
        skip_during_rebase: false,
    },
    Trigger {
        hook: "pre-push",
        operation: "push",
        skip_during_rebase: false,
    },
    Trigger {
        hook: "post-checkout",
        operation: "checkout",
        skip_during_rebase: true,
    },
];

/// What an installation pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    /// Hooks written (new or refreshed)
    pub installed: Vec<String>,
    /// Hooks left alone because a foreign script already occupies them
    pub skipped: Vec<String>,
}

/// Shell fragment exiting early while a rebase is underway
const REBASE_GUARD: &str = "\
case \"$GIT_REFLOG_ACTION\" in\n\
\x20   rebase*) exit 0 ;;\n\
esac\n\
for state in rebase-merge rebase-apply; do\n\
\x20   if [ -d \"$(git rev-parse --git-path \"$state\")\" ]; then\n\
\x20       exit 0\n\
\x20   fi\n\
done\n";

/// Render the hook script for `trigger`
pub fn render_script(trigger: &Trigger, executable: &Path) -> String {
    let guard = if trigger.skip_during_rebase {
        REBASE_GUARD
    } else {
        ""
    };
    format!(
        "#!/bin/sh\n\
         {marker}. Re-run `easegit init` to refresh, delete to disable.\n\
         {guard}\
         EASEGIT_BIN={bin}\n\
         if [ -x \"$EASEGIT_BIN\" ]; then\n\
         \x20   \"$EASEGIT_BIN\" checkpoint {operation} || true\n\
         fi\n\
         exit 0\n",
        marker = HOOK_MARKER,
        guard = guard,
        bin = shell_quote(&executable.to_string_lossy()),
        operation = trigger.operation,
    )
}

/// Single-quote `value` for a POSIX shell
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

/// Whether the hook file at `path` was written by easegit
pub fn is_managed(path: &Path) -> bool {
    fs::read_to_string(path)
        .map(|content| content.contains(HOOK_MARKER))
        .unwrap_or(false)
}

/// Install every trigger into `hooks_dir`
///
/// Idempotent: scripts written by easegit are refreshed in place, foreign
/// hooks are reported as skipped and never overwritten.
pub fn install(hooks_dir: &Path, executable: &Path) -> Result<InstallReport> {
    fs::create_dir_all(hooks_dir).map_err(|e| {
        EaseGitError::HookInstall(format!("cannot create {:?}: {}", hooks_dir, e))
    })?;

    let mut report = InstallReport::default();
    for trigger in &TRIGGERS {
        let path = hooks_dir.join(trigger.hook);

        if path.exists() && !is_managed(&path) {
            warn!("Leaving existing {} hook untouched", trigger.hook);
            report.skipped.push(trigger.hook.to_string());
            continue;
        }

        write_script(&path, &render_script(trigger, executable))?;
        debug!("Installed {} hook at {:?}", trigger.hook, path);
        report.installed.push(trigger.hook.to_string());
    }

    info!(
        "Installed {} hooks, skipped {}",
        report.installed.len(),
        report.skipped.len()
    );
    Ok(report)
}

/// Hooks in `hooks_dir` that are currently managed by easegit
pub fn installed(hooks_dir: &Path) -> Vec<PathBuf> {
    TRIGGERS
        .iter()
        .map(|trigger| hooks_dir.join(trigger.hook))
        .filter(|path| is_managed(path))
        .collect()
}

fn write_script(path: &Path, script: &str) -> Result<()> {
    utils::atomic_write(path, script.as_bytes())
        .and_then(|_| utils::set_permissions(path, 0o755))
        .map_err(|e| EaseGitError::HookInstall(format!("cannot write {:?}: {}", path, e)))
}
