//! Pre-swap snapshots of live deployments.
//!
//! Snapshots live at `<backup_root>/<module>/<UTC timestamp>`. They are
//! never pruned or restored automatically.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

use crate::config::schema::validate_module_name;
use crate::error::UpgradeError;
use crate::fs::copy_tree;

/// Directory name format of a snapshot.
pub const SNAPSHOT_FORMAT: &str = "%Y%m%dT%H%M%S%.3fZ";

/// One existing snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupEntry {
    pub path: PathBuf,
    /// Parsed from the directory name; `None` for foreign directories
    pub taken_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct BackupManager {
    root: PathBuf,
}

impl BackupManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn module_dir(&self, module: &str) -> PathBuf {
        self.root.join(module)
    }

    /// Copy the current contents of `deploy_path` into a new snapshot.
    ///
    /// `Ok(None)` when there is nothing deployed yet.
    pub fn backup(&self, deploy_path: &Path, module: &str) -> Result<Option<PathBuf>, UpgradeError> {
        if !deploy_path.exists() {
            return Ok(None);
        }
        self.snapshot(deploy_path, module)
            .with_context(|| {
                format!(
                    "Failed to back up {} for {}",
                    deploy_path.display(),
                    module
                )
            })
            .map(Some)
            .map_err(UpgradeError::backup)
    }

    fn snapshot(&self, deploy_path: &Path, module: &str) -> anyhow::Result<PathBuf> {
        validate_module_name(module)?;
        let module_dir = self.module_dir(module);
        fs::create_dir_all(&module_dir)
            .with_context(|| format!("Failed to create directory: {}", module_dir.display()))?;

        let stamp = Utc::now().format(SNAPSHOT_FORMAT).to_string();
        let mut dest = module_dir.join(&stamp);
        let mut n = 1;
        while dest.exists() {
            dest = module_dir.join(format!("{}-{}", stamp, n));
            n += 1;
        }

        copy_tree(deploy_path, &dest)?;
        Ok(dest)
    }

    /// Existing snapshots of `module`, newest first.
    pub fn list(&self, module: &str) -> anyhow::Result<Vec<BackupEntry>> {
        let module_dir = self.module_dir(module);
        let entries = match fs::read_dir(&module_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read directory: {}", module_dir.display()));
            }
        };

        let mut backups = Vec::new();
        for entry in entries {
            let entry = entry.with_context(|| {
                format!("Failed to read directory entry in {}", module_dir.display())
            })?;
            if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            backups.push((name.clone(), BackupEntry {
                path: entry.path(),
                taken_at: parse_snapshot_name(&name),
            }));
        }
        // Timestamp names sort chronologically; collision suffixes sort after
        // their base name.
        backups.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(backups.into_iter().map(|(_, entry)| entry).collect())
    }
}

fn parse_snapshot_name(name: &str) -> Option<DateTime<Utc>> {
    let base = name.split_once('-').map(|(b, _)| b).unwrap_or(name);
    NaiveDateTime::parse_from_str(base, SNAPSHOT_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    fn write_file(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn missing_deploy_path_is_not_backed_up() {
        let tmp = TempDir::new().unwrap();
        let manager = BackupManager::new(tmp.path().join("backups"));
        let result = manager.backup(&tmp.path().join("missing"), "shell").unwrap();
        assert_eq!(result, None);
        assert!(!tmp.path().join("backups").exists());
    }

    #[test]
    fn snapshot_contains_every_deployed_file() {
        let tmp = TempDir::new().unwrap();
        let deploy = tmp.path().join("www");
        write_file(&deploy.join("index.html"), "v1");
        write_file(&deploy.join("assets").join("app.js"), "js");
        let manager = BackupManager::new(tmp.path().join("backups"));

        let snapshot = manager.backup(&deploy, "shell").unwrap().unwrap();

        assert!(snapshot.starts_with(tmp.path().join("backups").join("shell")));
        assert_eq!(fs::read_to_string(snapshot.join("index.html")).unwrap(), "v1");
        assert_eq!(
            fs::read_to_string(snapshot.join("assets").join("app.js")).unwrap(),
            "js"
        );
        assert!(deploy.join("index.html").exists(), "source must be untouched");
    }

    #[test]
    fn back_to_back_snapshots_do_not_collide() {
        let tmp = TempDir::new().unwrap();
        let deploy = tmp.path().join("www");
        write_file(&deploy.join("index.html"), "v1");
        let manager = BackupManager::new(tmp.path().join("backups"));

        let first = manager.backup(&deploy, "shell").unwrap().unwrap();
        let second = manager.backup(&deploy, "shell").unwrap().unwrap();
        assert_ne!(first, second);
        assert_eq!(manager.list("shell").unwrap().len(), 2);
    }

    #[test]
    fn list_is_newest_first() {
        let tmp = TempDir::new().unwrap();
        let manager = BackupManager::new(tmp.path());
        let module_dir = tmp.path().join("shell");
        fs::create_dir_all(module_dir.join("20240101T000000.000Z")).unwrap();
        fs::create_dir_all(module_dir.join("20250301T120000.500Z")).unwrap();
        fs::create_dir_all(module_dir.join("20240615T080000.000Z")).unwrap();

        let listed = manager.list("shell").unwrap();
        let names: Vec<_> = listed
            .iter()
            .map(|b| b.path.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "20250301T120000.500Z",
                "20240615T080000.000Z",
                "20240101T000000.000Z"
            ]
        );
        assert!(listed[0].taken_at.is_some());
    }

    #[test]
    fn list_of_unknown_module_is_empty() {
        let tmp = TempDir::new().unwrap();
        let manager = BackupManager::new(tmp.path());
        assert!(manager.list("shell").unwrap().is_empty());
    }

    #[test]
    fn unwritable_backup_root_is_a_backup_error() {
        let tmp = TempDir::new().unwrap();
        let deploy = tmp.path().join("www");
        write_file(&deploy.join("index.html"), "v1");
        // A file where the backup root should be
        let blocked = tmp.path().join("backups");
        fs::write(&blocked, "not a directory").unwrap();

        let err = BackupManager::new(&blocked)
            .backup(&deploy, "shell")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Backup);
        assert!(err.to_string().contains("Failed to back up"));
    }

    #[test]
    fn snapshot_names_parse_back() {
        let parsed = parse_snapshot_name("20250301T120000.500Z").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2025-03-01T12:00:00.500+00:00");
        assert!(parse_snapshot_name("20250301T120000.500Z-1").is_some());
        assert!(parse_snapshot_name("manual-copy").is_none());
    }
}
