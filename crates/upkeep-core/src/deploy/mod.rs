//! Deployment: build-output discovery and the swap into the live path.

pub mod discovery;
pub mod swap;

pub use discovery::{OutputDir, discover_output};
pub use swap::{DeployReport, DeploymentSwapper};
