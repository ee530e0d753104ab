//! End-to-end cache decision flow
//!
//! ```text
//! START -> HASHED -> BLOOM_OK ----------> contains? --no--> build
//!                 \                          |yes
//!                  BLOOM_UNAVAILABLE          v
//!                      |               lookup_entry --NotFound--> build
//!                      v                     |Found
//!                    build                   v
//!                                   key set == expected? --no--> fatal
//!                                            |yes
//!                                         RESTORED
//! build -> execute -> store_entry -> BUILT_AND_STORED
//! ```
//!
//! Every step finishes before the next one starts. Only bloom filter load
//! failures are recovered from; everything else aborts the invocation.

use crate::bloom::BloomManager;
use crate::error::{StepCacheError, StepCacheResult};
use crate::executor::BuildExecutor;
use crate::fsutil::write_atomic;
use crate::hash::{compute_hash, InputHash};
use crate::registry::{check_key_set, LookupResult, OutputFiles, Registry, StoreEntry};
use crate::step::BuildStep;
use std::fmt;
use tokio::fs;
use tracing::{debug, info, warn};

/// Why a step was built instead of restored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildReason {
    /// The local filter could not be loaded
    BloomUnavailable,
    /// The filter says the hash was never stored
    BloomMiss,
    /// The filter matched but the registry has no entry
    RegistryMiss,
}

impl fmt::Display for BuildReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::BloomUnavailable => "bloom filter unavailable",
            Self::BloomMiss => "not in bloom filter",
            Self::RegistryMiss => "registry miss",
        };
        f.write_str(text)
    }
}

/// How an invocation completed
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Outputs were downloaded from the registry
    Restored { hash: InputHash },
    /// Outputs were built locally and published
    Built {
        hash: InputHash,
        elapsed_secs: f64,
        reason: BuildReason,
    },
}

impl Outcome {
    pub fn hash(&self) -> &InputHash {
        match self {
            Self::Restored { hash } | Self::Built { hash, .. } => hash,
        }
    }
}

/// What to do after consulting the bloom filter
enum Probe {
    Lookup,
    Build(BuildReason),
}

/// Composes hashing, filtering, lookup, execution and publishing
pub struct Orchestrator<'a> {
    registry: &'a dyn Registry,
    bloom: BloomManager,
    executor: BuildExecutor,
    verify_when_unavailable: bool,
}

impl<'a> Orchestrator<'a> {
    pub fn new(registry: &'a dyn Registry, bloom: BloomManager, executor: BuildExecutor) -> Self {
        Self {
            registry,
            bloom,
            executor,
            verify_when_unavailable: false,
        }
    }

    /// Ask the registry even when the local filter cannot be loaded
    pub fn verify_when_unavailable(mut self, enabled: bool) -> Self {
        self.verify_when_unavailable = enabled;
        self
    }

    /// Restore the step's outputs from the cache, or build and publish them
    pub async fn run(&self, step: &BuildStep) -> StepCacheResult<Outcome> {
        step.validate()?;
        let hash = compute_hash(step)?;
        info!("'{}' has input hash {}", step.name, hash);

        let probe = match self.bloom.load(&step.arch).await {
            Ok(filter) if filter.contains(&hash) => Probe::Lookup,
            Ok(_) => {
                debug!("{} is not in the bloom filter", hash);
                Probe::Build(BuildReason::BloomMiss)
            }
            Err(e) => {
                warn!("{}; cache state unknown", e);
                if self.verify_when_unavailable {
                    Probe::Lookup
                } else {
                    Probe::Build(BuildReason::BloomUnavailable)
                }
            }
        };

        let reason = match probe {
            Probe::Build(reason) => reason,
            Probe::Lookup => match self.registry.lookup_entry(&hash, &step.arch).await? {
                LookupResult::Found(files) => {
                    self.restore(step, files).await?;
                    info!("Restored '{}' from {}", step.name, self.registry.location());
                    return Ok(Outcome::Restored { hash });
                }
                LookupResult::NotFound => BuildReason::RegistryMiss,
            },
        };

        self.build_and_store(step, hash, reason).await
    }

    /// Write a cache hit to the expected output paths
    ///
    /// The key set is checked before any file is touched.
    async fn restore(&self, step: &BuildStep, files: OutputFiles) -> StepCacheResult<()> {
        check_key_set(&step.output_kinds(), &files)?;

        for (kind, path) in &step.outputs {
            let content = files.get(kind).ok_or_else(|| {
                StepCacheError::Internal(format!("output '{}' vanished after validation", kind))
            })?;
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).await.map_err(|e| {
                    StepCacheError::io(format!("creating directory {}", parent.display()), e)
                })?;
            }
            write_atomic(path, content).await?;
            debug!("Wrote {} ({} bytes)", path.display(), content.len());
        }
        Ok(())
    }

    async fn build_and_store(
        &self,
        step: &BuildStep,
        hash: InputHash,
        reason: BuildReason,
    ) -> StepCacheResult<Outcome> {
        info!("Building '{}' ({})", step.name, reason);
        let output = self.executor.run(step).await?;

        let entry = StoreEntry {
            hash,
            arch: step.arch.clone(),
            build_time_secs: output.elapsed_secs,
            files: output.files,
        };
        self.registry.store_entry(&entry).await?;
        info!(
            "Stored '{}' ({} outputs, built in {:.2}s)",
            step.name,
            entry.files.len(),
            entry.build_time_secs
        );

        Ok(Outcome::Built {
            hash,
            elapsed_secs: output.elapsed_secs,
            reason,
        })
    }
}
