//! Dependency installation for fetched module sources.

use std::path::Path;

use tracing::debug;

use crate::error::UpgradeError;
use crate::process::{ProcessError, run_captured, shell_command};

/// Dependency manifest whose presence triggers an install.
pub const MANIFEST_FILE: &str = "package.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed,
    /// No manifest in the workspace root
    Skipped,
}

/// Runs the configured install command when a manifest is present.
#[derive(Debug, Clone)]
pub struct DependencyInstaller {
    command: String,
    max_output: usize,
}

impl DependencyInstaller {
    pub fn new(command: impl Into<String>, max_output: usize) -> Self {
        Self {
            command: command.into(),
            max_output,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn install(&self, workspace: &Path) -> Result<InstallOutcome, UpgradeError> {
        if !workspace.join(MANIFEST_FILE).is_file() {
            debug!(workspace = %workspace.display(), "no manifest, skipping install");
            return Ok(InstallOutcome::Skipped);
        }

        let mut cmd = shell_command(&self.command, workspace);
        cmd.env("CI", "true");
        let output = run_captured(&mut cmd, self.max_output).map_err(|err| match err {
            ProcessError::OutputLimitExceeded { limit, .. } => UpgradeError::DependencyInstall(
                format!("`{}` exceeded {} bytes of output", self.command, limit),
            ),
            other => UpgradeError::DependencyInstall(other.to_string()),
        })?;

        if !output.success() {
            return Err(UpgradeError::DependencyInstall(
                output.failure_summary(&self.command),
            ));
        }
        Ok(InstallOutcome::Installed)
    }
}
