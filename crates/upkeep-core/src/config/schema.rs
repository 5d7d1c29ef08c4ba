//! Configuration schema for upkeep.toml
//!
//! ```toml
//! [settings]
//! temp_root = "/tmp/upkeep"
//! backup_root = "/var/backups/upkeep"
//!
//! [[module]]
//! name = "shell"
//! remote = "https://git.example.com/web/shell.git"
//! kind = "frontend"
//! deploy_path = "/srv/www/shell"
//! build_command = "npm run build"
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::paths;

/// Branch used when a module does not name one.
pub const DEFAULT_BRANCH: &str = "main";

/// Clean, reproducible, non-interactive dependency install.
pub const DEFAULT_INSTALL_COMMAND: &str = "npm ci --no-audit --no-fund";

/// Lower bound for the captured build output buffer (10 MiB).
pub const MIN_BUILD_OUTPUT: usize = 10 * 1024 * 1024;

/// Root configuration structure for upkeep.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpkeepConfig {
    #[serde(default)]
    pub settings: Settings,

    /// Module definitions, in upgrade/report order
    #[serde(default, rename = "module")]
    pub modules: Vec<ModuleConfig>,
}

impl UpkeepConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let mut seen = HashSet::new();
        for module in &self.modules {
            module.validate()?;
            if !seen.insert(module.name.as_str()) {
                anyhow::bail!("Duplicate module name '{}'", module.name);
            }
        }
        Ok(())
    }

    pub fn module(&self, name: &str) -> Option<&ModuleConfig> {
        self.modules.iter().find(|m| m.name == name)
    }
}

/// Pipeline-wide settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Parent of per-module workspaces
    #[serde(default = "paths::default_temp_root")]
    pub temp_root: PathBuf,

    /// Parent of per-module backup snapshots
    #[serde(default = "paths::default_backup_root")]
    pub backup_root: PathBuf,

    /// Shell command run when a dependency manifest is present
    #[serde(default = "default_install_command")]
    pub install_command: String,

    /// Captured build output cap in bytes (raised to 10 MiB if lower)
    #[serde(default = "default_max_build_output")]
    pub max_build_output: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            temp_root: paths::default_temp_root(),
            backup_root: paths::default_backup_root(),
            install_command: default_install_command(),
            max_build_output: default_max_build_output(),
        }
    }
}

impl Settings {
    /// Settings rooted under a single directory (tests, sandboxes).
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            temp_root: root.join("workspaces"),
            backup_root: root.join("backups"),
            ..Self::default()
        }
    }

    pub fn with_install_command(mut self, command: impl Into<String>) -> Self {
        self.install_command = command.into();
        self
    }

    pub fn build_output_limit(&self) -> usize {
        self.max_build_output.max(MIN_BUILD_OUTPUT)
    }
}

fn default_install_command() -> String {
    DEFAULT_INSTALL_COMMAND.to_string()
}

fn default_max_build_output() -> usize {
    MIN_BUILD_OUTPUT
}

/// Build-output discovery convention of a module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    Frontend,
    Backend,
    Microfrontend,
}

impl ModuleKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ModuleKind::Frontend => "frontend",
            ModuleKind::Backend => "backend",
            ModuleKind::Microfrontend => "microfrontend",
        }
    }

    /// Output directories probed in order; the first existing one wins.
    pub fn output_candidates(self) -> &'static [&'static str] {
        match self {
            ModuleKind::Frontend | ModuleKind::Microfrontend => &["dist", "build", "out", "public"],
            ModuleKind::Backend => &["dist"],
        }
    }

    /// Whether the whole workspace is deployed when no candidate exists.
    pub fn deploys_workspace_root(self) -> bool {
        matches!(self, ModuleKind::Backend)
    }
}

impl std::fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One independently versioned, independently deployed module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Unique identifier; also names the workspace and backup directories
    pub name: String,

    /// Git remote (URL or local path)
    pub remote: String,

    pub kind: ModuleKind,

    /// Absolute path of the live artifact directory
    pub deploy_path: PathBuf,

    /// Shell command run inside the fetched source tree
    pub build_command: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

impl ModuleConfig {
    pub fn new(
        name: impl Into<String>,
        remote: impl Into<String>,
        kind: ModuleKind,
        deploy_path: impl Into<PathBuf>,
        build_command: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            remote: remote.into(),
            kind,
            deploy_path: deploy_path.into(),
            build_command: build_command.into(),
            branch: None,
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    /// Configured branch, or [`DEFAULT_BRANCH`].
    pub fn branch(&self) -> &str {
        self.branch.as_deref().unwrap_or(DEFAULT_BRANCH)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        validate_module_name(&self.name)?;
        if self.remote.trim().is_empty() {
            anyhow::bail!("Module '{}' has an empty remote", self.name);
        }
        if self.remote.starts_with('-') {
            anyhow::bail!("Module '{}' has an invalid remote: {}", self.name, self.remote);
        }
        if !self.deploy_path.is_absolute() {
            anyhow::bail!(
                "Module '{}' deploy_path must be absolute: {}",
                self.name,
                self.deploy_path.display()
            );
        }
        if self.build_command.trim().is_empty() {
            anyhow::bail!("Module '{}' has an empty build_command", self.name);
        }
        if let Some(branch) = &self.branch
            && (branch.trim().is_empty() || branch.starts_with('-'))
        {
            anyhow::bail!("Module '{}' has an invalid branch: '{}'", self.name, branch);
        }
        Ok(())
    }
}

/// Module names become directory names under the temp and backup roots.
pub fn validate_module_name(name: &str) -> anyhow::Result<()> {
    if name.trim().is_empty() {
        anyhow::bail!("Module name cannot be empty");
    }
    if name == "." || name == ".." || name.contains(['/', '\\']) {
        anyhow::bail!("Module name '{}' must be a single path component", name);
    }
    Ok(())
}
