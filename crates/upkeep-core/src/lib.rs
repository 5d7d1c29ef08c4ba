//! Upkeep Core Library
//!
//! Provides the module upgrade pipeline: fetching a module's source,
//! installing its dependencies, building it, snapshotting the live
//! deployment and swapping the new build output into place. Also exposes
//! batch upgrades and read-only status reporting across a configured fleet.

pub mod backup;
pub mod build;
pub mod config;
pub mod context;
pub mod deploy;
pub mod error;
pub mod events;
pub mod fs;
pub mod git;
pub mod install;
pub mod lock;
pub mod pipeline;
pub mod process;
pub mod service;
pub mod status;
pub mod types;
pub mod version;
pub mod workspace;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{ConfigStore, ModuleConfig, ModuleKind, Settings, UpkeepConfig};

    // Errors
    pub use crate::error::{ErrorKind, UpgradeError};

    // Events
    pub use crate::events::{EventSink, EventStatus, MemorySink, PipelineEvent, TracingSink};

    // Pipeline
    pub use crate::pipeline::{BatchCoordinator, Stage, UpgradePipeline};

    // Service
    pub use crate::context::AppContext;
    pub use crate::service::UpgradeService;

    // Results
    pub use crate::types::{ModuleStatus, UpgradeOutcome, VersionState};

    // Version
    pub use crate::version::{UNKNOWN_VERSION, VersionResolver};
}
