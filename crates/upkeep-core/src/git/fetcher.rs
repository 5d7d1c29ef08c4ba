//! Source fetcher: brings a module workspace to the tip of its branch.

use std::path::Path;

use anyhow::Context;
use tracing::debug;

use super::{is_checkout, run_git};
use crate::config::ModuleConfig;
use crate::error::UpgradeError;

/// How the workspace was brought up to date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    /// Fresh single-branch clone
    Cloned,
    /// Existing checkout fetched and fast-forwarded
    Updated,
}

/// Clones module sources, or fast-forwards an existing checkout.
#[derive(Debug, Default, Clone)]
pub struct SourceFetcher;

impl SourceFetcher {
    pub fn new() -> Self {
        Self
    }

    /// Fetch `config`'s branch into `workspace`.
    ///
    /// Local modifications in an existing checkout are not reconciled; if
    /// they block the update the error is returned as is.
    pub fn fetch(&self, config: &ModuleConfig, workspace: &Path) -> Result<FetchMode, UpgradeError> {
        let branch = config.branch();
        if is_checkout(workspace) {
            Self::update(workspace, branch)
                .with_context(|| {
                    format!("Failed to update {} to origin/{}", config.name, branch)
                })
                .map_err(UpgradeError::source_fetch)?;
            Ok(FetchMode::Updated)
        } else {
            Self::clone_into(&config.remote, branch, workspace)
                .with_context(|| format!("Failed to clone {} from {}", config.name, config.remote))
                .map_err(UpgradeError::source_fetch)?;
            Ok(FetchMode::Cloned)
        }
    }

    fn clone_into(remote: &str, branch: &str, dest: &Path) -> anyhow::Result<()> {
        let dest = dest
            .to_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid workspace path: {}", dest.display()))?;
        run_git(
            None,
            &[
                "clone",
                "--branch",
                branch,
                "--single-branch",
                "--",
                remote,
                dest,
            ],
        )?;
        Ok(())
    }

    fn update(workspace: &Path, branch: &str) -> anyhow::Result<()> {
        run_git(Some(workspace), &["fetch", "origin", branch])?;

        if let Err(err) = run_git(Some(workspace), &["checkout", branch]) {
            debug!(branch, error = %err, "no local branch, creating it from FETCH_HEAD");
            run_git(Some(workspace), &["checkout", "-b", branch, "FETCH_HEAD"])
                .map_err(|_| err)?;
        }

        run_git(Some(workspace), &["merge", "--ff-only", "FETCH_HEAD"])?;
        Ok(())
    }
}
