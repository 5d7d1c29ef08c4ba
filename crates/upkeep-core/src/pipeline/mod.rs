//! The per-module upgrade pipeline and its batch wrapper.

pub mod batch;
pub mod runner;
pub mod stage;

pub use batch::BatchCoordinator;
pub use runner::UpgradePipeline;
pub use stage::Stage;
