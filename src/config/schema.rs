//! Configuration schema for stepcache
//!
//! Configuration is stored at `~/.config/stepcache/config.toml`

use crate::step::CpuArch;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Remote registry settings
    pub registry: RegistryConfig,

    /// Local bloom filter settings
    pub bloom: BloomConfig,

    /// Build execution settings
    pub build: BuildConfig,
}

impl Config {
    /// Architecture used for hashing, filters and registry calls
    pub fn arch(&self) -> CpuArch {
        self.build
            .arch
            .as_deref()
            .map(CpuArch::new)
            .unwrap_or_else(CpuArch::host)
    }

    /// Bloom snapshot path for an architecture
    pub fn bloom_path(&self, arch: &CpuArch) -> PathBuf {
        self.bloom
            .path
            .clone()
            .unwrap_or_else(|| crate::bloom::BloomManager::default_path(arch))
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Registry connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Base URL of the registry
    pub url: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080".to_string(),
            timeout_secs: 300,
        }
    }
}

/// Bloom filter settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BloomConfig {
    /// Snapshot file (defaults to the user cache dir, one file per arch)
    pub path: Option<PathBuf>,

    /// Query the registry when the filter cannot be loaded instead of
    /// assuming a miss
    pub verify_when_unavailable: bool,
}

/// Build execution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Shell used to run build commands (`<shell> -c <command>`)
    pub shell: String,

    /// Target architecture override (defaults to the host)
    pub arch: Option<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            shell: "sh".to_string(),
            arch: None,
        }
    }
}
