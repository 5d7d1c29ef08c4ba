//! Git operations for acquiring module sources and inspecting remotes.
//!
//! - Cloning or fast-forwarding a module workspace
//! - Listing remote tags and the remote HEAD without a checkout

mod fetcher;
mod remote;

use std::path::Path;
use std::process::Command;

use anyhow::Context;
use tracing::debug;

pub use fetcher::{FetchMode, SourceFetcher};
pub use remote::{list_remote_tags, remote_head};

/// Name of the VCS metadata directory inside a checkout.
pub const GIT_DIR_NAME: &str = ".git";

const GIT_ENV_OVERRIDES: [&str; 4] = [
    "GIT_DIR",
    "GIT_WORK_TREE",
    "GIT_INDEX_FILE",
    "GIT_COMMON_DIR",
];

/// A `git` command isolated from the caller's repository environment.
///
/// Terminal prompts are disabled so an authentication failure errors out
/// instead of waiting for input.
pub fn git_command() -> Command {
    let mut cmd = Command::new("git");
    for key in GIT_ENV_OVERRIDES {
        cmd.env_remove(key);
    }
    cmd.env("GIT_TERMINAL_PROMPT", "0");
    cmd
}

/// Run a git command and return its trimmed stdout.
pub fn run_git(cwd: Option<&Path>, args: &[&str]) -> anyhow::Result<String> {
    let mut cmd = git_command();
    cmd.args(args);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    debug!(?args, cwd = ?cwd, "git");
    let output = cmd
        .output()
        .with_context(|| format!("Failed to run git {:?}", args))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("Git command failed {:?}: {}", args, stderr.trim());
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Whether `dir` holds a checkout (has a `.git` entry).
pub fn is_checkout(dir: &Path) -> bool {
    dir.join(GIT_DIR_NAME).exists()
}
