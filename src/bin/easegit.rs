//! # EaseGit CLI - Undo for risky Git operations
//!
//! Command-line front end for the easegit library.
//!
//! ## Usage
//! ```bash
//! # Install the hooks that take checkpoints automatically
//! easegit init
//!
//! # Show the latest checkpoint and the working tree state
//! easegit status
//!
//! # Bring the working directory back to the latest checkpoint
//! easegit undo
//! ```

use chrono::{DateTime, Local, Utc};
use clap::{CommandFactory, Parser, Subcommand};
use colored::*;
use easegit::snapshot;
use easegit::{hooks, EaseGit, Git, LatestCheckpoint, Result};
use humantime::format_duration;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Environment variable selecting the git executable
const GIT_ENV: &str = "EASEGIT_GIT";

/// Environment variable holding a `tracing` filter directive
const LOG_ENV: &str = "EASEGIT_LOG";

/// EaseGit CLI - automatic checkpoints before rebase, merge, push and checkout
#[derive(Parser)]
#[command(name = "easegit")]
#[command(version)]
#[command(about = "Checkpoint the workspace before rebase, merge, push and checkout, then undo")]
#[command(long_about = None)]
struct Cli {
    /// Path inside the repository (defaults to current)
    #[arg(short, long, global = true)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Install the checkpoint hooks in this repository
    Init,

    /// Show the latest checkpoint and working tree state
    #[command(alias = "st")]
    Status,

    /// Restore the working directory to the latest checkpoint
    Undo,

    /// Take a checkpoint before an operation (called by the hooks)
    #[command(hide = true)]
    Checkpoint {
        /// Operation label recorded with the checkpoint
        #[arg(default_value = "unknown")]
        operation: String,
    },
}

fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    // Disable colors if needed
    if std::env::var_os("NO_COLOR").is_some() {
        colored::control::set_override(false);
    }

    let Some(command) = cli.command else {
        let _ = Cli::command().print_help();
        println!();
        return;
    };

    let root_path = cli.path.unwrap_or_else(|| PathBuf::from("."));
    if let Err(e) = run(command, root_path) {
        eprintln!("{}: {}", "Error".red().bold(), e.user_message());
        std::process::exit(1);
    }
}

/// Diagnostics go to stderr so they never mix with command output
fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV).ok().or_else(|| {
        (verbose || snapshot::diagnostics_enabled()).then(|| EnvFilter::new("easegit=debug"))
    });

    if let Some(filter) = filter {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Main command runner
fn run(command: Commands, root_path: PathBuf) -> Result<()> {
    match command {
        Commands::Init => cmd_init(root_path),
        Commands::Status => cmd_status(root_path),
        Commands::Undo => cmd_undo(root_path),
        Commands::Checkpoint { operation } => {
            cmd_checkpoint(root_path, &operation);
            Ok(())
        }
    }
}

/// Adapter handle honoring `EASEGIT_GIT`
fn git_handle(root_path: PathBuf) -> Git {
    match std::env::var_os(GIT_ENV) {
        Some(program) if !program.is_empty() => Git::new(root_path).with_program(program),
        _ => Git::new(root_path),
    }
}

fn open_easegit(root_path: PathBuf) -> Result<EaseGit> {
    Ok(EaseGit::with_git(git_handle(root_path).discover()?))
}

/// Install the hooks
///
/// Existing easegit hooks are refreshed; hooks written by anything else are
/// left untouched and listed.
fn cmd_init(root_path: PathBuf) -> Result<()> {
    let easegit = open_easegit(root_path)?;
    let executable = std::fs::canonicalize(std::env::current_exe()?)?;

    println!("{}", "Initializing EaseGit...".blue().bold());

    let report = easegit.init(&executable)?;

    for hook in &report.hooks.installed {
        println!("  {} {}", "✓".green().bold(), hook);
    }
    for hook in &report.hooks.skipped {
        println!(
            "  {} {} {}",
            "!".yellow().bold(),
            hook,
            "(existing hook left untouched)".yellow()
        );
    }

    println!(
        "{} Installed {} of {} hooks",
        "✓".green().bold(),
        report.hooks.installed.len(),
        hooks::TRIGGERS.len()
    );
    println!("  Repository: {}", easegit.root().display().to_string().cyan());
    println!("  Hooks: {}", report.hooks_dir.display().to_string().cyan());
    println!("\nNext steps:");
    println!("  - Rebase, merge, push or checkout as usual; a checkpoint is taken first");
    println!("  - Undo a mistake: {}", "easegit undo".yellow());

    Ok(())
}

/// Show status
fn cmd_status(root_path: PathBuf) -> Result<()> {
    let easegit = open_easegit(root_path)?;
    let status = easegit.status()?;

    println!("{}", "EaseGit Status:".blue().bold());
    println!("  Repository: {}", status.root.display().to_string().cyan());
    println!();

    match &status.latest {
        LatestCheckpoint::None => {
            println!("{}", "No checkpoints available".yellow());
        }
        LatestCheckpoint::Corrupted(reference) => {
            println!("{}", "Checkpoint data corrupted".red().bold());
            println!("  Reference: {}", reference.name());
        }
        LatestCheckpoint::Available(info) => {
            println!("{}", "Latest checkpoint:".bold());
            println!("  Created: {}", describe_time(info.created_at()));
            println!("  Operation: {}", info.operation.cyan());
            println!("  Commit: {}", info.commit.short().yellow());
        }
    }
    println!("  Total checkpoints: {}", status.checkpoint_count);
    let undo = if status.latest.is_available() {
        "yes".green()
    } else {
        "no".red()
    };
    println!("Undo available: {}", undo);

    println!("\n{}", "Working tree:".bold());
    println!("  Changes: {}", flag(status.dirty, "uncommitted changes", "clean"));
    println!("  HEAD: {}", flag(status.detached_head, "detached", "on a branch"));
    println!("  Conflicts: {}", flag(status.unmerged_paths, "unmerged paths", "none"));

    println!("\n{}", "Triggers:".bold());
    if status.installed_triggers.is_empty() {
        println!("  {} (run {})", "not installed".yellow(), "easegit init".yellow());
    } else {
        println!(
            "  installed ({}/{})",
            status.installed_triggers.len(),
            hooks::TRIGGERS.len()
        );
    }
    if let Some(config) = &status.config {
        println!("  Executable: {}", config.executable.display());
        println!(
            "  Initialized: {}",
            config
                .installed_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
        );
    }

    Ok(())
}

/// Restore the latest checkpoint
fn cmd_undo(root_path: PathBuf) -> Result<()> {
    let easegit = open_easegit(root_path)?;

    println!("{}", "Restoring latest checkpoint...".blue().bold());

    let result = easegit.undo()?;

    println!("{} Restoration complete", "✓".green().bold());
    println!("  Checkpoint: {}", describe_time(result.checkpoint.created_at()));
    println!("  Operation: {}", result.checkpoint.operation.cyan());
    println!("  Files restored: {}", result.files_restored.to_string().cyan());
    println!(
        "  Files removed: {}",
        result.files_removed.len().to_string().yellow()
    );
    for path in &result.files_removed {
        println!("    - {}", path.display());
    }
    println!(
        "  Time: {}",
        format_duration(Duration::from_millis(result.duration_ms))
            .to_string()
            .cyan()
    );

    Ok(())
}

/// Best-effort checkpoint; silent unless diagnostics are enabled
fn cmd_checkpoint(root_path: PathBuf, operation: &str) {
    let git = git_handle(root_path);
    if let Some(snapshot) = snapshot::create_checkpoint(&git, operation) {
        debug!("Recorded {}", snapshot.reference);
    }
}

/// Local wall-clock time plus age, e.g. `2024-06-10 16:00:00 (3m 12s ago)`
fn describe_time(created_at: Option<DateTime<Utc>>) -> String {
    let Some(created_at) = created_at else {
        return "unknown".to_string();
    };

    let local = created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S");
    let age = (Utc::now() - created_at)
        .to_std()
        .map(|age| Duration::from_secs(age.as_secs()))
        .unwrap_or_default();

    if age.is_zero() {
        format!("{} (just now)", local)
    } else {
        format!("{} ({} ago)", local, format_duration(age))
    }
}

fn flag(set: bool, when_set: &str, when_clear: &str) -> ColoredString {
    if set {
        when_set.yellow()
    } else {
        when_clear.green()
    }
}
