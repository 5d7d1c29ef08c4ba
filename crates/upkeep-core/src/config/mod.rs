//! Fleet configuration: module definitions and pipeline settings.
//!
//! The module list is loaded once (from `upkeep.toml` or any other source)
//! and handed to the service as an immutable value.

pub mod parser;
pub mod paths;
pub mod schema;
pub mod store;

pub use parser::{parse_upkeep_toml, parse_upkeep_toml_str, to_toml};
pub use paths::{default_backup_root, default_config_path, default_temp_root};
pub use schema::{
    DEFAULT_BRANCH, DEFAULT_INSTALL_COMMAND, MIN_BUILD_OUTPUT, ModuleConfig, ModuleKind, Settings,
    UpkeepConfig,
};
pub use store::ConfigStore;
