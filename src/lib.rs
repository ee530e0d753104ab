//! stepcache - distributed build artifact cache client
//!
//! Hashes a build step's inputs into a content address, consults a local
//! bloom filter and the remote registry, and either restores cached outputs
//! or runs the build and publishes the result.

pub mod bloom;
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod fsutil;
pub mod hash;
pub mod orchestrator;
pub mod registry;
pub mod step;

pub use error::{StepCacheError, StepCacheResult};
pub use hash::{compute_hash, InputHash};
pub use orchestrator::{Orchestrator, Outcome};
pub use step::{BuildStep, CpuArch};
