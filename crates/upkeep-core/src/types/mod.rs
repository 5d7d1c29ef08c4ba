//! Result records handed back to callers of the service.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ModuleKind;
use crate::error::{ErrorKind, UpgradeError};
use crate::pipeline::Stage;

/// Terminal record of one pipeline run for one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeOutcome {
    pub module_name: String,
    pub success: bool,
    /// Resolved version on success, failing step and detail on failure
    pub message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<Stage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<PathBuf>,
    /// blake3 digest of the deployed tree
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_digest: Option<String>,
}

impl UpgradeOutcome {
    pub fn succeeded(
        module_name: impl Into<String>,
        version: impl Into<String>,
        backup_path: Option<PathBuf>,
        artifact_digest: Option<String>,
    ) -> Self {
        let module_name = module_name.into();
        let version = version.into();
        Self {
            message: format!("Upgraded {} to version {}", module_name, version),
            module_name,
            success: true,
            timestamp: Utc::now(),
            version: Some(version),
            error_kind: None,
            failed_stage: None,
            backup_path,
            artifact_digest,
        }
    }

    pub fn failed(
        module_name: impl Into<String>,
        stage: Option<Stage>,
        error: &UpgradeError,
        backup_path: Option<PathBuf>,
    ) -> Self {
        let module_name = module_name.into();
        let message = match stage {
            Some(stage) => format!(
                "Upgrade of {} failed while {}: {}",
                module_name,
                stage.describe(),
                error
            ),
            None => format!("Upgrade of {} failed: {}", module_name, error),
        };
        Self {
            module_name,
            success: false,
            message,
            timestamp: Utc::now(),
            version: None,
            error_kind: Some(error.kind()),
            failed_stage: stage,
            backup_path,
            artifact_digest: None,
        }
    }
}

/// Deployed-vs-remote comparison, by exact string equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersionState {
    #[serde(rename = "up-to-date")]
    UpToDate,
    #[serde(rename = "outdated")]
    Outdated,
}

impl VersionState {
    /// `v1.0.0` and `1.0.0` are different versions here.
    pub fn compare(current: &str, latest: &str) -> Self {
        if current == latest {
            VersionState::UpToDate
        } else {
            VersionState::Outdated
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VersionState::UpToDate => "up-to-date",
            VersionState::Outdated => "outdated",
        }
    }
}

/// Read-only snapshot of one module, recomputed on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleStatus {
    pub name: String,
    pub kind: ModuleKind,
    pub current_version: String,
    pub latest_version: String,
    pub deploy_path: PathBuf,
    pub status: VersionState,
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
