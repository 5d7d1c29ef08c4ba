//! Upgrade pipeline execution.
//!
//! One run drives one module through
//! `Init → Fetching → Installing → Building → BackingUp → Deploying →
//! ResolvingVersion → Done`, stopping at the first failing step. Every
//! transition is reported to the injected [`EventSink`], and the workspace
//! is removed on every exit path.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info_span, warn};

use crate::backup::BackupManager;
use crate::build::Builder;
use crate::config::{ModuleConfig, Settings};
use crate::deploy::DeploymentSwapper;
use crate::error::UpgradeError;
use crate::events::{EventSink, EventStatus, PipelineEvent};
use crate::git::{FetchMode, SourceFetcher};
use crate::install::{DependencyInstaller, InstallOutcome};
use crate::pipeline::Stage;
use crate::types::UpgradeOutcome;
use crate::version::VersionResolver;
use crate::workspace::{Workspace, WorkspaceManager};

/// Sequences the pipeline components for one module at a time.
///
/// Holds no per-run state, so one instance serves any number of runs.
/// Callers that may run concurrently must serialize runs of the same
/// module themselves (see [`crate::lock::ModuleLocks`]).
pub struct UpgradePipeline {
    workspaces: WorkspaceManager,
    fetcher: SourceFetcher,
    installer: DependencyInstaller,
    builder: Builder,
    backups: BackupManager,
    swapper: DeploymentSwapper,
    versions: VersionResolver,
    events: Arc<dyn EventSink>,
}

impl UpgradePipeline {
    pub fn new(settings: &Settings, events: Arc<dyn EventSink>) -> Self {
        let max_output = settings.build_output_limit();
        Self {
            workspaces: WorkspaceManager::new(&settings.temp_root),
            fetcher: SourceFetcher::new(),
            installer: DependencyInstaller::new(&settings.install_command, max_output),
            builder: Builder::new(max_output),
            backups: BackupManager::new(&settings.backup_root),
            swapper: DeploymentSwapper::new(),
            versions: VersionResolver::new(),
            events,
        }
    }

    pub fn workspaces(&self) -> &WorkspaceManager {
        &self.workspaces
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    pub fn versions(&self) -> &VersionResolver {
        &self.versions
    }

    /// Upgrade one module. Never panics on step failure; the verdict is in
    /// the returned outcome.
    pub fn run(&self, config: &ModuleConfig) -> UpgradeOutcome {
        let _span = info_span!("upgrade", module = %config.name).entered();
        let mut run = PipelineRun::new(self.events.as_ref(), &config.name);

        let workspace = match run.step(Stage::Init, || self.prepare(config)) {
            Ok(workspace) => {
                run.succeed(format!("workspace {}", workspace.path().display()));
                workspace
            }
            Err(err) => return run.finish_failed(&err, None),
        };

        let mut backup_path = None;
        let result = self.execute(&mut run, config, workspace.path(), &mut backup_path);
        self.release(&run, workspace);

        match result {
            Ok((version, digest)) => run.finish_succeeded(version, backup_path, digest),
            Err(err) => run.finish_failed(&err, backup_path),
        }
    }

    /// An invalid definition is a `Configuration` error. Failing to create
    /// the workspace is a filesystem failure and reported as `Deployment`.
    fn prepare(&self, config: &ModuleConfig) -> Result<Workspace, UpgradeError> {
        config
            .validate()
            .map_err(|err| UpgradeError::Configuration(format!("{err:#}")))?;
        self.workspaces
            .acquire(&config.name)
            .map_err(UpgradeError::deployment)
    }

    fn execute(
        &self,
        run: &mut PipelineRun<'_>,
        config: &ModuleConfig,
        workspace: &Path,
        backup_path: &mut Option<PathBuf>,
    ) -> Result<(String, Option<String>), UpgradeError> {
        let mode = run.step(Stage::Fetching, || self.fetcher.fetch(config, workspace))?;
        run.succeed(match mode {
            FetchMode::Cloned => format!("cloned {} ({})", config.remote, config.branch()),
            FetchMode::Updated => format!("fast-forwarded to origin/{}", config.branch()),
        });

        match run.step(Stage::Installing, || self.installer.install(workspace))? {
            InstallOutcome::Installed => run.succeed(self.installer.command()),
            InstallOutcome::Skipped => run.skip("no package.json"),
        }

        run.step(Stage::Building, || {
            self.builder.build(workspace, &config.build_command)
        })?;
        run.succeed(config.build_command.as_str());

        match run.step(Stage::BackingUp, || {
            self.backups.backup(&config.deploy_path, &config.name)
        })? {
            Some(path) => {
                run.succeed(path.display().to_string());
                *backup_path = Some(path);
            }
            None => run.skip("nothing deployed yet"),
        }

        let report = run.step(Stage::Deploying, || {
            self.swapper
                .deploy(workspace, &config.deploy_path, config.kind)
        })?;
        run.succeed(format!(
            "{} -> {}",
            report.output_dir.display(),
            config.deploy_path.display()
        ));

        let version = run.step(Stage::ResolvingVersion, || {
            Ok(self.versions.resolve_built_version(workspace))
        })?;
        run.succeed(version.as_str());

        Ok((version, report.digest))
    }

    /// Cleanup failures are warnings; they never change the verdict.
    fn release(&self, run: &PipelineRun<'_>, workspace: Workspace) {
        let path = workspace.path().to_path_buf();
        if let Err(err) = workspace.cleanup() {
            warn!(path = %path.display(), error = %err, "failed to remove workspace");
            run.emit(
                run.stage,
                EventStatus::Warning,
                Some(format!("failed to remove workspace {}: {}", path.display(), err)),
            );
        }
    }
}

/// Tracks the current stage of one run and reports transitions.
struct PipelineRun<'a> {
    events: &'a dyn EventSink,
    module: &'a str,
    stage: Stage,
}

impl<'a> PipelineRun<'a> {
    fn new(events: &'a dyn EventSink, module: &'a str) -> Self {
        Self {
            events,
            module,
            stage: Stage::Init,
        }
    }

    fn emit(&self, stage: Stage, status: EventStatus, message: Option<String>) {
        let mut event = PipelineEvent::new(self.module, stage, status);
        if let Some(message) = message {
            event = event.with_message(message);
        }
        self.events.emit(event);
    }

    /// Enter `stage` and run it. A failure is reported against `stage`,
    /// which stays current so the caller can attribute it.
    fn step<T>(
        &mut self,
        stage: Stage,
        f: impl FnOnce() -> Result<T, UpgradeError>,
    ) -> Result<T, UpgradeError> {
        debug_assert!(
            stage == Stage::Init || self.stage.can_transition_to(stage),
            "{} -> {}",
            self.stage,
            stage
        );
        self.stage = stage;
        self.emit(stage, EventStatus::Started, None);
        let result = f();
        if let Err(err) = &result {
            self.emit(stage, EventStatus::Failed, Some(err.to_string()));
        }
        result
    }

    fn succeed(&self, message: impl Into<String>) {
        self.emit(self.stage, EventStatus::Succeeded, Some(message.into()));
    }

    fn skip(&self, message: impl Into<String>) {
        self.emit(self.stage, EventStatus::Skipped, Some(message.into()));
    }

    fn finish_succeeded(
        self,
        version: String,
        backup_path: Option<PathBuf>,
        digest: Option<String>,
    ) -> UpgradeOutcome {
        let outcome = UpgradeOutcome::succeeded(self.module, version, backup_path, digest);
        self.emit(
            Stage::Done,
            EventStatus::Succeeded,
            Some(outcome.message.clone()),
        );
        outcome
    }

    fn finish_failed(self, err: &UpgradeError, backup_path: Option<PathBuf>) -> UpgradeOutcome {
        let outcome = UpgradeOutcome::failed(self.module, Some(self.stage), err, backup_path);
        self.emit(
            Stage::Failed,
            EventStatus::Failed,
            Some(outcome.message.clone()),
        );
        outcome
    }
}
