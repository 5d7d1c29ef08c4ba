//! Config store for loading and saving upkeep.toml.

use std::path::{Path, PathBuf};

use anyhow::Context;

use super::{UpkeepConfig, parser, paths::default_config_path};

#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_path: PathBuf,
}

impl ConfigStore {
    pub fn from_default_location() -> anyhow::Result<Self> {
        Ok(Self::from_path(default_config_path()?))
    }

    pub fn from_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load the config; a missing file is an empty fleet.
    pub fn load(&self) -> anyhow::Result<UpkeepConfig> {
        if !self.config_path.exists() {
            return Ok(UpkeepConfig::new());
        }
        parser::parse_upkeep_toml(&self.config_path)
    }

    pub fn save(&self, config: &UpkeepConfig) -> anyhow::Result<()> {
        config.validate()?;
        let content = parser::to_toml(config).context("Failed to serialize config to TOML")?;
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        std::fs::write(&self.config_path, content).with_context(|| {
            format!(
                "Failed to write config file: {}",
                self.config_path.display()
            )
        })?;
        Ok(())
    }
}
