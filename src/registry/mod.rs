//! Remote cache registry protocol
//!
//! Three request/response exchanges: fetch a bloom filter snapshot, look up
//! an entry, and store an entry. Every response variant is a tagged enum and
//! callers match on it exhaustively. There are no retries here; retry policy
//! belongs to the transport.

pub mod http;
#[cfg(test)]
pub(crate) mod testing;
pub mod wire;

pub use http::HttpRegistry;

use crate::bloom::BloomSnapshot;
use crate::config::Config;
use crate::error::{StepCacheError, StepCacheResult};
use crate::hash::InputHash;
use crate::step::CpuArch;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// Output kind tag -> file contents
pub type OutputFiles = BTreeMap<String, Vec<u8>>;

/// Response to `load-bloom`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterFetch {
    Snapshot(BloomSnapshot),
    Failed { reason: String },
}

/// Response to `load-entry`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupResult {
    Found(OutputFiles),
    NotFound,
}

/// A freshly built result to publish
#[derive(Debug, Clone, PartialEq)]
pub struct StoreEntry {
    pub hash: InputHash,
    pub arch: CpuArch,
    pub build_time_secs: f64,
    pub files: OutputFiles,
}

/// Remote registry interface
///
/// Implemented over HTTP by `HttpRegistry`; tests use an in-memory registry.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Fetch the current bloom filter snapshot for an architecture
    async fn fetch_filter(&self, arch: &CpuArch) -> StepCacheResult<FilterFetch>;

    /// Authoritative lookup of a cache entry
    async fn lookup_entry(&self, hash: &InputHash, arch: &CpuArch)
        -> StepCacheResult<LookupResult>;

    /// Publish a cache entry; returns once the registry has acknowledged it
    async fn store_entry(&self, entry: &StoreEntry) -> StepCacheResult<()>;

    /// Where requests go, for display
    fn location(&self) -> String;
}

/// Create the registry client described by the configuration
pub fn create_registry(config: &Config) -> Box<dyn Registry> {
    Box::new(HttpRegistry::new(
        &config.registry.url,
        Duration::from_secs(config.registry.timeout_secs),
    ))
}

/// Require the returned output kinds to equal the expected ones exactly
///
/// A partial or over-complete hit is a protocol violation, not a miss.
pub fn check_key_set(expected: &BTreeSet<&str>, found: &OutputFiles) -> StepCacheResult<()> {
    let missing: Vec<String> = expected
        .iter()
        .filter(|kind| !found.contains_key(**kind))
        .map(|kind| kind.to_string())
        .collect();

    let unexpected: Vec<String> = found
        .keys()
        .filter(|kind| !expected.contains(kind.as_str()))
        .cloned()
        .collect();

    if missing.is_empty() && unexpected.is_empty() {
        Ok(())
    } else {
        Err(StepCacheError::OutputKeyMismatch {
            missing,
            unexpected,
        })
    }
}
