//! Application context for unified dependency injection.

use std::path::Path;
use std::sync::Arc;

use crate::backup::BackupManager;
use crate::config::{ModuleConfig, Settings, UpkeepConfig};
use crate::events::EventSink;
use crate::pipeline::UpgradePipeline;
use crate::service::UpgradeService;
use crate::status::StatusReporter;
use crate::version::VersionResolver;
use crate::workspace::WorkspaceManager;

/// Unified application context for dependency injection.
///
/// Frontends create this once from the loaded settings and ask it for the
/// components they need.
#[derive(Debug, Clone)]
pub struct AppContext {
    settings: Settings,
}

impl AppContext {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Context for a loaded configuration file.
    pub fn from_config(config: &UpkeepConfig) -> Self {
        Self::new(config.settings.clone())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn temp_root(&self) -> &Path {
        &self.settings.temp_root
    }

    pub fn backup_root(&self) -> &Path {
        &self.settings.backup_root
    }

    pub fn workspace_manager(&self) -> WorkspaceManager {
        WorkspaceManager::new(&self.settings.temp_root)
    }

    pub fn backup_manager(&self) -> BackupManager {
        BackupManager::new(&self.settings.backup_root)
    }

    pub fn version_resolver(&self) -> VersionResolver {
        VersionResolver::new()
    }

    pub fn status_reporter(&self) -> StatusReporter {
        StatusReporter::new(self.version_resolver())
    }

    /// Pipeline reporting to `events`.
    pub fn pipeline(&self, events: Arc<dyn EventSink>) -> UpgradePipeline {
        UpgradePipeline::new(&self.settings, events)
    }

    /// Service over `modules`, the entry point for every outer surface.
    pub fn upgrade_service(
        &self,
        modules: Vec<ModuleConfig>,
        events: Arc<dyn EventSink>,
    ) -> UpgradeService {
        UpgradeService::new(modules, self.pipeline(events), self.status_reporter())
    }
}
