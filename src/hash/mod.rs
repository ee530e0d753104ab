//! Content-addressed hashing of build steps
//!
//! The InputHash is SHA-256 over the metadata digest followed by one digest
//! per dependency file, taken in byte order of the path. Identical inputs
//! give identical hashes on every machine; any change to the command,
//! dependency contents, context, name, version or architecture changes it.

pub mod canonical;

use crate::error::{StepCacheError, StepCacheResult};
use crate::step::BuildStep;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Length of an InputHash digest in bytes
pub const HASH_LEN: usize = 32;

/// Canonical content address of a build step's inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InputHash([u8; HASH_LEN]);

impl InputHash {
    pub fn from_digest(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for InputHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for InputHash {
    type Err = StepCacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; HASH_LEN];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|e| StepCacheError::Internal(format!("invalid input hash '{}': {}", s, e)))?;
        Ok(Self(bytes))
    }
}

/// SHA-256 of a dependency file's raw contents
fn digest_file(path: &Path) -> StepCacheResult<[u8; HASH_LEN]> {
    let contents = fs::read(path).map_err(|e| StepCacheError::DependencyRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(Sha256::digest(&contents).into())
}

/// Dependencies in the order they are folded into the hash
fn canonical_order(step: &BuildStep) -> Vec<&PathBuf> {
    let mut deps: Vec<&PathBuf> = step.dependencies.iter().collect();
    deps.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
    deps
}

/// Compute the InputHash of a build step
///
/// Fails only if a dependency cannot be read.
pub fn compute_hash(step: &BuildStep) -> StepCacheResult<InputHash> {
    let metadata = canonical::encode_metadata(step);
    let metadata_digest = Sha256::digest(&metadata);

    let mut hasher = Sha256::new();
    hasher.update(metadata_digest);

    for path in canonical_order(step) {
        let digest = digest_file(path)?;
        debug!("{} -> {}", path.display(), hex::encode(&digest[..6]));
        hasher.update(digest);
    }

    let hash = InputHash(hasher.finalize().into());
    debug!("InputHash for '{}': {}", step.name, hash);
    Ok(hash)
}
