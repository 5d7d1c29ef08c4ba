//! Locating the build output inside a workspace.

use std::path::{Path, PathBuf};

use crate::config::ModuleKind;
use crate::error::UpgradeError;

/// Directory whose contents get deployed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDir {
    pub path: PathBuf,
    /// The workspace root itself (backend without `dist`); VCS metadata is
    /// excluded from the copy.
    pub whole_tree: bool,
}

/// Probe the conventional output directories of `kind`, first match wins.
pub fn discover_output(workspace: &Path, kind: ModuleKind) -> Result<OutputDir, UpgradeError> {
    let candidates = kind.output_candidates();
    if let Some(path) = candidates
        .iter()
        .map(|name| workspace.join(name))
        .find(|path| path.is_dir())
    {
        return Ok(OutputDir {
            path,
            whole_tree: false,
        });
    }

    if kind.deploys_workspace_root() {
        return Ok(OutputDir {
            path: workspace.to_path_buf(),
            whole_tree: true,
        });
    }

    Err(UpgradeError::OutputNotFound {
        workspace: workspace.to_path_buf(),
        candidates: candidates.iter().map(|c| c.to_string()).collect(),
    })
}
