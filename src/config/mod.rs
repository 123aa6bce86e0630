//! Configuration for the discovery and execution engines.

pub mod builder;
pub mod types;

pub use builder::ExplorationConfigBuilder;
pub use types::{ExplorationConfig, ExplorationStrategy, RunnerConfig};
