//! In-memory registry for tests

use super::{FilterFetch, LookupResult, OutputFiles, Registry, StoreEntry};
use crate::bloom::BloomSnapshot;
use crate::error::{StepCacheError, StepCacheResult};
use crate::hash::InputHash;
use crate::step::CpuArch;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
struct State {
    filter: Option<BloomSnapshot>,
    entries: HashMap<(InputHash, CpuArch), OutputFiles>,
    lookups: Vec<InputHash>,
    stores: Vec<StoreEntry>,
    fail_stores: bool,
}

/// Registry that keeps everything in memory and records every call
#[derive(Default)]
pub struct MemoryRegistry {
    state: Mutex<State>,
}

impl MemoryRegistry {
    pub fn set_filter(&self, snapshot: BloomSnapshot) {
        self.state.lock().unwrap().filter = Some(snapshot);
    }

    pub fn insert(&self, hash: InputHash, arch: CpuArch, files: OutputFiles) {
        self.state.lock().unwrap().entries.insert((hash, arch), files);
    }

    pub fn fail_stores(&self) {
        self.state.lock().unwrap().fail_stores = true;
    }

    pub fn lookups(&self) -> Vec<InputHash> {
        self.state.lock().unwrap().lookups.clone()
    }

    pub fn stores(&self) -> Vec<StoreEntry> {
        self.state.lock().unwrap().stores.clone()
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn fetch_filter(&self, _arch: &CpuArch) -> StepCacheResult<FilterFetch> {
        Ok(match self.state.lock().unwrap().filter.clone() {
            Some(snapshot) => FilterFetch::Snapshot(snapshot),
            None => FilterFetch::Failed {
                reason: "no filter published".to_string(),
            },
        })
    }

    async fn lookup_entry(
        &self,
        hash: &InputHash,
        arch: &CpuArch,
    ) -> StepCacheResult<LookupResult> {
        let mut state = self.state.lock().unwrap();
        state.lookups.push(*hash);
        Ok(match state.entries.get(&(*hash, arch.clone())) {
            Some(files) => LookupResult::Found(files.clone()),
            None => LookupResult::NotFound,
        })
    }

    async fn store_entry(&self, entry: &StoreEntry) -> StepCacheResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_stores {
            return Err(StepCacheError::registry("store-entry", "connection reset"));
        }
        state.stores.push(entry.clone());
        state
            .entries
            .insert((entry.hash, entry.arch.clone()), entry.files.clone());
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
