//! Sequential batch upgrades.

use std::collections::HashSet;

use crate::config::ModuleConfig;
use crate::error::UpgradeError;
use crate::types::UpgradeOutcome;

/// Runs a single-module upgrade over a selection of the configured modules.
#[derive(Debug, Clone, Copy)]
pub struct BatchCoordinator<'a> {
    modules: &'a [ModuleConfig],
}

impl<'a> BatchCoordinator<'a> {
    pub fn new(modules: &'a [ModuleConfig]) -> Self {
        Self { modules }
    }

    /// Modules selected by `names`, in configuration order, plus the
    /// requested names that match nothing (first occurrence order).
    ///
    /// `None` selects every module.
    pub fn select(&self, names: Option<&[String]>) -> (Vec<&'a ModuleConfig>, Vec<String>) {
        let Some(names) = names else {
            return (self.modules.iter().collect(), Vec::new());
        };

        let requested: HashSet<&str> = names.iter().map(String::as_str).collect();
        let selected = self
            .modules
            .iter()
            .filter(|m| requested.contains(m.name.as_str()))
            .collect();

        let mut seen = HashSet::new();
        let unknown = names
            .iter()
            .filter(|name| !self.modules.iter().any(|m| &m.name == *name))
            .filter(|name| seen.insert(*name))
            .cloned()
            .collect();

        (selected, unknown)
    }

    /// Upgrade the selection one module after another.
    ///
    /// A failed module does not stop the ones after it. Unknown names get a
    /// configuration-error outcome appended after the configured modules.
    pub fn run<F>(&self, names: Option<&[String]>, mut upgrade: F) -> Vec<UpgradeOutcome>
    where
        F: FnMut(&ModuleConfig) -> UpgradeOutcome,
    {
        let (selected, unknown) = self.select(names);
        let mut outcomes: Vec<UpgradeOutcome> = selected.into_iter().map(&mut upgrade).collect();
        outcomes.extend(unknown.iter().map(|name| {
            UpgradeOutcome::failed(name, None, &UpgradeError::unknown_module(name), None)
        }));
        outcomes
    }
}
