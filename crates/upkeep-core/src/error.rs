//! Error taxonomy for the upgrade pipeline.
//!
//! Every pipeline step fails with exactly one [`UpgradeError`] variant. The
//! public surface never returns these directly: they are folded into an
//! [`UpgradeOutcome`](crate::types::UpgradeOutcome) carrying the [`ErrorKind`].

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by individual pipeline steps.
#[derive(Error, Debug)]
pub enum UpgradeError {
    /// Unknown module name or invalid module definition
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Clone/fetch/checkout of the module source failed
    #[error("source fetch failed: {0}")]
    SourceFetch(String),

    /// The dependency install command exited non-zero
    #[error("dependency install failed: {0}")]
    DependencyInstall(String),

    /// The build command failed or produced too much output
    #[error("build failed: {0}")]
    Build(String),

    /// The pre-swap snapshot of the deploy path could not be taken
    #[error("backup failed: {0}")]
    Backup(String),

    /// No conventional build output directory exists in the workspace
    #[error("no build output found in {} (looked for {})", workspace.display(), candidates.join(", "))]
    OutputNotFound {
        workspace: PathBuf,
        candidates: Vec<String>,
    },

    /// Filesystem failure while swapping the deploy path
    #[error("deployment failed: {0}")]
    Deployment(String),
}

impl UpgradeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UpgradeError::Configuration(_) => ErrorKind::Configuration,
            UpgradeError::SourceFetch(_) => ErrorKind::SourceFetch,
            UpgradeError::DependencyInstall(_) => ErrorKind::DependencyInstall,
            UpgradeError::Build(_) => ErrorKind::Build,
            UpgradeError::Backup(_) => ErrorKind::Backup,
            UpgradeError::OutputNotFound { .. } => ErrorKind::OutputNotFound,
            UpgradeError::Deployment(_) => ErrorKind::Deployment,
        }
    }

    pub fn unknown_module(name: &str) -> Self {
        UpgradeError::Configuration(format!("unknown module '{}'", name))
    }

    /// Wrap an `anyhow` chain as a source fetch failure.
    pub fn source_fetch(err: anyhow::Error) -> Self {
        UpgradeError::SourceFetch(format!("{err:#}"))
    }

    pub fn backup(err: anyhow::Error) -> Self {
        UpgradeError::Backup(format!("{err:#}"))
    }

    pub fn deployment(err: anyhow::Error) -> Self {
        UpgradeError::Deployment(format!("{err:#}"))
    }
}

/// Serializable discriminant of [`UpgradeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    SourceFetch,
    DependencyInstall,
    Build,
    Backup,
    OutputNotFound,
    Deployment,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::SourceFetch => "source_fetch",
            ErrorKind::DependencyInstall => "dependency_install",
            ErrorKind::Build => "build",
            ErrorKind::Backup => "backup",
            ErrorKind::OutputNotFound => "output_not_found",
            ErrorKind::Deployment => "deployment",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
