//! Registry client over HTTP
//!
//! Each operation is one JSON `POST {base}/{endpoint}`. ureq is blocking, so
//! requests run on tokio's blocking pool; the caller still awaits each one
//! before moving on.

use super::wire::{
    self, LoadBloomRequest, LoadBloomResponse, LoadEntryRequest, LoadEntryResponse,
    StoreEntryRequest, StoreEntryResponse,
};
use super::{FilterFetch, LookupResult, Registry, StoreEntry};
use crate::error::{StepCacheError, StepCacheResult};
use crate::hash::InputHash;
use crate::step::CpuArch;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;
use ureq::Agent;

/// HTTP registry client
pub struct HttpRegistry {
    base_url: String,
    agent: Agent,
}

impl HttpRegistry {
    /// Create a client for `base_url` with a per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: config.into(),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    async fn post<Req, Resp>(&self, endpoint: &'static str, body: &Req) -> StepCacheResult<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned + Send + 'static,
    {
        let payload = serde_json::to_vec(body)?;
        let agent = self.agent.clone();
        let url = self.url(endpoint);
        debug!("POST {} ({} bytes)", url, payload.len());

        tokio::task::spawn_blocking(move || {
            let mut response = agent
                .post(&url)
                .header("content-type", "application/json")
                .send(&payload[..])
                .map_err(|e| StepCacheError::registry(endpoint, e))?;

            let bytes = response
                .body_mut()
                .with_config()
                .limit(u64::MAX)
                .read_to_vec()
                .map_err(|e| StepCacheError::registry(endpoint, e))?;

            serde_json::from_slice::<Resp>(&bytes).map_err(|e| {
                StepCacheError::registry(endpoint, format!("invalid response body: {}", e))
            })
        })
        .await
        .map_err(|e| StepCacheError::Internal(format!("registry request task failed: {}", e)))?
    }
}

#[async_trait]
impl Registry for HttpRegistry {
    async fn fetch_filter(&self, arch: &CpuArch) -> StepCacheResult<FilterFetch> {
        let request = LoadBloomRequest {
            cpu_arch: arch.clone(),
        };
        let response: LoadBloomResponse = self.post(wire::LOAD_BLOOM, &request).await?;
        Ok(response.into())
    }

    async fn lookup_entry(
        &self,
        hash: &InputHash,
        arch: &CpuArch,
    ) -> StepCacheResult<LookupResult> {
        let request = LoadEntryRequest {
            input_hash: hash.to_hex(),
            cpu_arch: arch.clone(),
        };
        let response: LoadEntryResponse = self.post(wire::LOAD_ENTRY, &request).await?;
        response.into_lookup()
    }

    async fn store_entry(&self, entry: &StoreEntry) -> StepCacheResult<()> {
        let request = StoreEntryRequest::from(entry);
        let response: StoreEntryResponse = self.post(wire::STORE_ENTRY, &request).await?;
        match response {
            StoreEntryResponse::Ok => Ok(()),
            StoreEntryResponse::Failed { reason } => Err(StepCacheError::RegistryRejected {
                endpoint: wire::STORE_ENTRY.to_string(),
                reason,
            }),
        }
    }

    fn location(&self) -> String {
        self.base_url.clone()
    }
}
