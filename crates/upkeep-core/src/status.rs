//! Status reporting for configured modules.
//!
//! Every report is recomputed from the deploy paths and the remotes; nothing
//! is cached or persisted. A module whose state cannot be fully read still
//! appears in the report, with `"unknown"` versions and a diagnostic.

use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::ModuleConfig;
use crate::types::{ModuleStatus, VersionState};
use crate::version::VersionResolver;

// =============================================================================
// Data Structures
// =============================================================================

/// Summary counts for quick overview
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    pub total: usize,
    pub up_to_date: usize,
    pub outdated: usize,
    /// Entries carrying a diagnostic
    pub issues: usize,
}

impl StatusSummary {
    pub fn from_statuses(statuses: &[ModuleStatus]) -> Self {
        let mut summary = StatusSummary {
            total: statuses.len(),
            ..Self::default()
        };
        for status in statuses {
            match status.status {
                VersionState::UpToDate => summary.up_to_date += 1,
                VersionState::Outdated => summary.outdated += 1,
            }
            if status.error.is_some() {
                summary.issues += 1;
            }
        }
        summary
    }
}

// =============================================================================
// Collection
// =============================================================================

#[derive(Debug, Default, Clone)]
pub struct StatusReporter {
    versions: VersionResolver,
}

impl StatusReporter {
    pub fn new(versions: VersionResolver) -> Self {
        Self { versions }
    }

    /// One entry per module, in configuration order.
    pub fn status_all(&self, modules: &[ModuleConfig]) -> Vec<ModuleStatus> {
        modules.iter().map(|m| self.status_for(m)).collect()
    }

    pub fn status_for(&self, config: &ModuleConfig) -> ModuleStatus {
        let current_version = self.versions.resolve_deployed_version(&config.deploy_path);
        let latest_version = self.versions.resolve_latest_remote_version(&config.remote);
        let (last_updated, error) = match last_modified(&config.deploy_path) {
            Ok(modified) => (modified, None),
            Err(err) => (
                None,
                Some(format!(
                    "Failed to read {}: {}",
                    config.deploy_path.display(),
                    err
                )),
            ),
        };

        ModuleStatus {
            name: config.name.clone(),
            kind: config.kind,
            status: VersionState::compare(&current_version, &latest_version),
            current_version,
            latest_version,
            deploy_path: config.deploy_path.clone(),
            last_updated,
            error,
        }
    }
}

/// Modification time of `path`; `None` if it does not exist.
fn last_modified(path: &Path) -> io::Result<Option<DateTime<Utc>>> {
    match fs::metadata(path) {
        Ok(metadata) => Ok(Some(DateTime::<Utc>::from(metadata.modified()?))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
