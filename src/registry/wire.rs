//! JSON bodies exchanged with the registry
//!
//! File contents travel as standard base64. Responses are tagged by a
//! `status` field.

use super::{FilterFetch, LookupResult, OutputFiles, StoreEntry};
use crate::bloom::BloomSnapshot;
use crate::error::{StepCacheError, StepCacheResult};
use crate::step::CpuArch;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const LOAD_BLOOM: &str = "load-bloom";
pub const LOAD_ENTRY: &str = "load-entry";
pub const STORE_ENTRY: &str = "store-entry";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadBloomRequest {
    pub cpu_arch: CpuArch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoadBloomResponse {
    Ok { filter: BloomSnapshot },
    Failed { reason: String },
}

impl From<LoadBloomResponse> for FilterFetch {
    fn from(resp: LoadBloomResponse) -> Self {
        match resp {
            LoadBloomResponse::Ok { filter } => FilterFetch::Snapshot(filter),
            LoadBloomResponse::Failed { reason } => FilterFetch::Failed { reason },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadEntryRequest {
    pub input_hash: String,
    pub cpu_arch: CpuArch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoadEntryResponse {
    Found { files: BTreeMap<String, String> },
    NotFound,
}

impl LoadEntryResponse {
    pub fn into_lookup(self) -> StepCacheResult<LookupResult> {
        match self {
            Self::Found { files } => Ok(LookupResult::Found(decode_files(files)?)),
            Self::NotFound => Ok(LookupResult::NotFound),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreEntryRequest {
    pub input_hash: String,
    pub build_time_seconds: f64,
    pub cpu_arch: CpuArch,
    pub files: BTreeMap<String, String>,
}

impl From<&StoreEntry> for StoreEntryRequest {
    fn from(entry: &StoreEntry) -> Self {
        Self {
            input_hash: entry.hash.to_hex(),
            build_time_seconds: entry.build_time_secs,
            cpu_arch: entry.arch.clone(),
            files: encode_files(&entry.files),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StoreEntryResponse {
    Ok,
    Failed { reason: String },
}

pub fn encode_files(files: &OutputFiles) -> BTreeMap<String, String> {
    files
        .iter()
        .map(|(kind, content)| (kind.clone(), STANDARD.encode(content)))
        .collect()
}

pub fn decode_files(files: BTreeMap<String, String>) -> StepCacheResult<OutputFiles> {
    files
        .into_iter()
        .map(|(kind, encoded)| match STANDARD.decode(encoded.as_bytes()) {
            Ok(content) => Ok((kind, content)),
            Err(e) => Err(StepCacheError::Payload {
                kind,
                reason: e.to_string(),
            }),
        })
        .collect()
}
