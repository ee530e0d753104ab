//! CLI command implementations

pub mod bloom;
pub mod build;
pub mod config;
pub mod hash;

pub use bloom::execute as bloom;
pub use build::execute as build;
pub use config::execute as config;
pub use hash::execute as hash;

use crate::config::Config;
use crate::error::StepCacheResult;
use crate::step::{BuildStep, StepFile};
use std::path::Path;

/// Load a step file, applying the configured architecture as the default
pub(crate) async fn load_step(path: &Path, config: &Config) -> StepCacheResult<BuildStep> {
    StepFile::load(path).await?.into_step(&config.arch())
}
