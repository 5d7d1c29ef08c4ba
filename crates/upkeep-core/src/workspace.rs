//! Ephemeral per-module workspaces.
//!
//! A workspace lives at `<temp_root>/<module name>`. It is acquired at the
//! start of a pipeline run and removed when the run ends, whatever the
//! verdict. If a previous removal failed, the next run starts from
//! whatever the directory still holds.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::warn;

use crate::config::schema::validate_module_name;

/// Hands out workspaces under a single root.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the workspace of `module` lives, whether or not it exists.
    pub fn path_for(&self, module: &str) -> PathBuf {
        self.root.join(module)
    }

    /// Create (or reuse) the workspace of `module`.
    pub fn acquire(&self, module: &str) -> anyhow::Result<Workspace> {
        validate_module_name(module)?;
        let path = self.path_for(module);
        fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create workspace: {}", path.display()))?;
        Ok(Workspace {
            path,
            released: false,
        })
    }
}

/// A workspace directory removed on drop.
///
/// Prefer [`Workspace::cleanup`], which reports the removal error; the drop
/// fallback can only log it.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    released: bool,
}

impl Workspace {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the directory tree now.
    pub fn cleanup(mut self) -> io::Result<()> {
        self.released = true;
        remove_workspace(&self.path)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(err) = remove_workspace(&self.path) {
            warn!(path = %self.path.display(), error = %err, "failed to remove workspace");
        }
    }
}

fn remove_workspace(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
