//! Pipeline states.

use serde::{Deserialize, Serialize};

/// States of one upgrade run.
///
/// The happy path is strictly linear (`Init` through `Done`); `Failed` is
/// reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Init,
    Fetching,
    Installing,
    Building,
    BackingUp,
    Deploying,
    ResolvingVersion,
    Done,
    Failed,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::Fetching => "fetching",
            Stage::Installing => "installing",
            Stage::Building => "building",
            Stage::BackingUp => "backing_up",
            Stage::Deploying => "deploying",
            Stage::ResolvingVersion => "resolving_version",
            Stage::Done => "done",
            Stage::Failed => "failed",
        }
    }

    /// Human phrasing used in outcome messages ("failed while ...").
    pub fn describe(self) -> &'static str {
        match self {
            Stage::Init => "preparing the workspace",
            Stage::Fetching => "fetching source",
            Stage::Installing => "installing dependencies",
            Stage::Building => "building",
            Stage::BackingUp => "backing up the current deployment",
            Stage::Deploying => "deploying build output",
            Stage::ResolvingVersion => "resolving the built version",
            Stage::Done => "finishing",
            Stage::Failed => "failing",
        }
    }

    /// Successor on the happy path.
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Init => Some(Stage::Fetching),
            Stage::Fetching => Some(Stage::Installing),
            Stage::Installing => Some(Stage::Building),
            Stage::Building => Some(Stage::BackingUp),
            Stage::BackingUp => Some(Stage::Deploying),
            Stage::Deploying => Some(Stage::ResolvingVersion),
            Stage::ResolvingVersion => Some(Stage::Done),
            Stage::Done | Stage::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }

    pub fn can_transition_to(self, to: Stage) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == Stage::Failed || self.next() == Some(to)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
