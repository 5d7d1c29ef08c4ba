//! Manifest (`package.json`) version lookup.

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::install::MANIFEST_FILE;

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    version: Option<String>,
}

/// The `version` field of `<dir>/package.json`.
///
/// `Ok(None)` when there is no manifest or it has no usable version.
pub fn read_manifest_version(dir: &Path) -> anyhow::Result<Option<String>> {
    let path = dir.join(MANIFEST_FILE);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", path.display()));
        }
    };
    let manifest: Manifest = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(manifest
        .version
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty()))
}
