//! Replacing the live deployment with fresh build output.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::warn;

use super::discovery::discover_output;
use crate::config::ModuleKind;
use crate::error::UpgradeError;
use crate::fs::{copy_tree_filtered, hash_tree, remove_path_if_exists};
use crate::git::GIT_DIR_NAME;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployReport {
    pub output_dir: PathBuf,
    /// blake3 digest of the deploy path after the swap
    pub digest: Option<String>,
}

/// Swaps build output into deploy paths.
///
/// The swap is remove, recreate, copy. It is not crash-atomic; the backup
/// taken beforehand is the recovery path.
#[derive(Debug, Default, Clone)]
pub struct DeploymentSwapper;

impl DeploymentSwapper {
    pub fn new() -> Self {
        Self
    }

    pub fn deploy(
        &self,
        workspace: &Path,
        deploy_path: &Path,
        kind: ModuleKind,
    ) -> Result<DeployReport, UpgradeError> {
        let output = discover_output(workspace, kind)?;
        let skip: &[&str] = if output.whole_tree {
            &[GIT_DIR_NAME]
        } else {
            &[]
        };

        Self::swap(&output.path, deploy_path, skip)
            .with_context(|| {
                format!(
                    "Failed to deploy {} to {}",
                    output.path.display(),
                    deploy_path.display()
                )
            })
            .map_err(UpgradeError::deployment)?;

        // The files are already live; a digest failure only loses the fingerprint.
        let digest = match hash_tree(deploy_path) {
            Ok(digest) => Some(digest),
            Err(err) => {
                warn!(
                    deploy_path = %deploy_path.display(),
                    error = %format!("{err:#}"),
                    "failed to hash deployed tree"
                );
                None
            }
        };

        Ok(DeployReport {
            output_dir: output.path,
            digest,
        })
    }

    fn swap(output: &Path, deploy_path: &Path, skip: &[&str]) -> anyhow::Result<()> {
        remove_path_if_exists(deploy_path)?;
        fs::create_dir_all(deploy_path)
            .with_context(|| format!("Failed to create directory: {}", deploy_path.display()))?;
        copy_tree_filtered(output, deploy_path, skip)
    }
}
