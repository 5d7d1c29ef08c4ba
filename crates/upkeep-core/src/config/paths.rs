//! Default locations for config, workspaces and backups.

use std::path::PathBuf;

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    Ok(config_dir.join("upkeep").join("upkeep.toml"))
}

pub fn default_temp_root() -> PathBuf {
    std::env::temp_dir().join("upkeep")
}

pub fn default_backup_root() -> PathBuf {
    dirs::data_local_dir()
        .map(|p| p.join("upkeep").join("backups"))
        .unwrap_or_else(|| std::env::temp_dir().join("upkeep-backups"))
}
