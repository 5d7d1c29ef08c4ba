//! The upgrade service: status, single upgrades and batch upgrades over an
//! immutable module list.

use crate::backup::BackupEntry;
use crate::config::ModuleConfig;
use crate::error::UpgradeError;
use crate::lock::ModuleLocks;
use crate::pipeline::{BatchCoordinator, UpgradePipeline};
use crate::status::StatusReporter;
use crate::types::{ModuleStatus, UpgradeOutcome};

/// Facade over the pipeline for a fixed set of modules.
///
/// `Send + Sync`; share it behind an `Arc`. Runs of the same module are
/// serialized by a per-module lock, different modules do not contend.
pub struct UpgradeService {
    modules: Vec<ModuleConfig>,
    pipeline: UpgradePipeline,
    status: StatusReporter,
    locks: ModuleLocks,
}

impl UpgradeService {
    pub fn new(modules: Vec<ModuleConfig>, pipeline: UpgradePipeline, status: StatusReporter) -> Self {
        Self {
            modules,
            pipeline,
            status,
            locks: ModuleLocks::new(),
        }
    }

    pub fn modules(&self) -> &[ModuleConfig] {
        &self.modules
    }

    pub fn module(&self, name: &str) -> Option<&ModuleConfig> {
        self.modules.iter().find(|m| m.name == name)
    }

    pub fn locks(&self) -> &ModuleLocks {
        &self.locks
    }

    /// Current status of every configured module.
    pub fn modules_status(&self) -> Vec<ModuleStatus> {
        self.status.status_all(&self.modules)
    }

    /// Upgrade one module by name.
    ///
    /// An unknown name fails immediately, without taking a lock or touching
    /// the filesystem.
    pub fn upgrade_module(&self, name: &str) -> UpgradeOutcome {
        match self.module(name) {
            Some(config) => self.upgrade_locked(config),
            None => UpgradeOutcome::failed(name, None, &UpgradeError::unknown_module(name), None),
        }
    }

    /// Upgrade `names` (every module when `None`) one after another.
    pub fn batch_upgrade(&self, names: Option<&[String]>) -> Vec<UpgradeOutcome> {
        BatchCoordinator::new(&self.modules).run(names, |config| self.upgrade_locked(config))
    }

    /// Existing backups of a configured module, newest first.
    pub fn backups(&self, name: &str) -> anyhow::Result<Vec<BackupEntry>> {
        if self.module(name).is_none() {
            anyhow::bail!("Unknown module '{}'", name);
        }
        self.pipeline.backups().list(name)
    }

    fn upgrade_locked(&self, config: &ModuleConfig) -> UpgradeOutcome {
        self.locks
            .with_lock(&config.name, || self.pipeline.run(config))
    }
}
