//! Local bloom filter snapshots
//!
//! A snapshot is the architecture-tagged, serialized form of a `BloomFilter`.
//! The same JSON shape is used for the local file and for the registry's
//! `load-bloom` payload. Snapshots are replaced wholesale on refresh, never
//! patched.

use super::BloomFilter;
use crate::error::{BloomLoadError, StepCacheError, StepCacheResult};
use crate::fsutil::write_atomic;
use crate::registry::{FilterFetch, Registry};
use crate::step::CpuArch;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Snapshot format understood by this client
pub const SNAPSHOT_FORMAT: u32 = 1;

/// Serialized bloom filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloomSnapshot {
    pub format: u32,
    pub cpu_arch: CpuArch,
    pub num_bits: u64,
    pub num_hashes: u32,
    /// Base64 (standard alphabet) of the bit array
    pub bits: String,
}

impl BloomSnapshot {
    pub fn from_filter(arch: &CpuArch, filter: &BloomFilter) -> Self {
        Self {
            format: SNAPSHOT_FORMAT,
            cpu_arch: arch.clone(),
            num_bits: filter.num_bits(),
            num_hashes: filter.num_hashes(),
            bits: STANDARD.encode(filter.bits()),
        }
    }

    /// Validate architecture and bit layout, then decode
    pub fn into_filter(self, expected: &CpuArch) -> Result<BloomFilter, BloomLoadError> {
        if self.format != SNAPSHOT_FORMAT {
            return Err(BloomLoadError::InvalidBits(format!(
                "unsupported snapshot format {} (expected {})",
                self.format, SNAPSHOT_FORMAT
            )));
        }

        if &self.cpu_arch != expected {
            return Err(BloomLoadError::ArchMismatch {
                expected: expected.to_string(),
                found: self.cpu_arch.to_string(),
            });
        }

        let bits = STANDARD
            .decode(self.bits.as_bytes())
            .map_err(|e| BloomLoadError::InvalidBits(format!("bad base64: {}", e)))?;

        BloomFilter::from_parts(self.num_bits, self.num_hashes, bits)
    }
}

/// Loads, validates and refreshes the local snapshot file
pub struct BloomManager {
    path: PathBuf,
}

impl BloomManager {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Default snapshot location for an architecture
    pub fn default_path(arch: &CpuArch) -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("stepcache")
            .join(format!("bloom-{}.json", arch))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the local snapshot for `arch`
    ///
    /// Every failure is recoverable from the caller's point of view: the
    /// cache state is then unknown, not empty.
    pub async fn load(&self, arch: &CpuArch) -> Result<BloomFilter, BloomLoadError> {
        let content = match fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(BloomLoadError::Missing(self.path.clone()));
            }
            Err(e) => {
                return Err(BloomLoadError::Unparsable {
                    path: self.path.clone(),
                    reason: e.to_string(),
                });
            }
        };

        let snapshot: BloomSnapshot =
            serde_json::from_slice(&content).map_err(|e| BloomLoadError::Unparsable {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        let filter = snapshot.into_filter(arch)?;
        debug!(
            "Loaded bloom filter {} ({} bits, {} hashes, {:.1}% full)",
            self.path.display(),
            filter.num_bits(),
            filter.num_hashes(),
            filter.fill_ratio() * 100.0
        );
        Ok(filter)
    }

    /// Fetch a fresh snapshot from the registry and replace the local file
    ///
    /// Any failure here is fatal; this is a maintenance action, not part of
    /// the per-build path.
    pub async fn refresh(
        &self,
        registry: &dyn Registry,
        arch: &CpuArch,
    ) -> StepCacheResult<BloomFilter> {
        info!("Refreshing bloom filter for {}", arch);

        let snapshot = match registry.fetch_filter(arch).await? {
            FilterFetch::Snapshot(snapshot) => snapshot,
            FilterFetch::Failed { reason } => {
                return Err(StepCacheError::RegistryRejected {
                    endpoint: "load-bloom".to_string(),
                    reason,
                });
            }
        };

        // Refuse to persist something the next load would reject
        let filter = snapshot.clone().into_filter(arch)?;
        self.persist(&snapshot).await?;

        info!(
            "Bloom filter saved to {} ({} bits)",
            self.path.display(),
            filter.num_bits()
        );
        Ok(filter)
    }

    /// Write the snapshot to a sibling temp file and rename it into place
    async fn persist(&self, snapshot: &BloomSnapshot) -> StepCacheResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| {
                StepCacheError::io(format!("creating directory {}", parent.display()), e)
            })?;
        }

        let content = serde_json::to_vec(snapshot)?;
        write_atomic(&self.path, &content).await
    }
}
