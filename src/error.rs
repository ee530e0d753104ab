//! Error types for stepcache
//!
//! All modules use `StepCacheResult<T>` as their return type. Bloom filter
//! load failures get their own enum because the orchestrator recovers from
//! them instead of aborting.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for stepcache operations
pub type StepCacheResult<T> = Result<T, StepCacheError>;

/// Reasons a local bloom filter snapshot could not be used
#[derive(Error, Debug)]
pub enum BloomLoadError {
    #[error("bloom filter not found at {0}")]
    Missing(PathBuf),

    #[error("bloom filter at {path} is unreadable: {reason}")]
    Unparsable { path: PathBuf, reason: String },

    #[error("bloom filter was built for {found}, expected {expected}")]
    ArchMismatch { expected: String, found: String },

    #[error("bloom filter bit layout is invalid: {0}")]
    InvalidBits(String),
}

/// All errors that can occur in stepcache
#[derive(Error, Debug)]
pub enum StepCacheError {
    // Input errors
    #[error("Failed to read dependency {path}: {source}")]
    DependencyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid build step: {0}")]
    StepInvalid(String),

    #[error("Failed to read step file {path}: {reason}")]
    StepFile { path: PathBuf, reason: String },

    // Bloom filter errors
    #[error(transparent)]
    Bloom(#[from] BloomLoadError),

    // Protocol errors
    #[error(
        "Registry returned outputs that do not match the build step \
         (missing: [{}], unexpected: [{}])",
        .missing.join(", "),
        .unexpected.join(", ")
    )]
    OutputKeyMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("Registry request to {endpoint} failed: {reason}")]
    Registry { endpoint: String, reason: String },

    #[error("Registry rejected {endpoint}: {reason}")]
    RegistryRejected { endpoint: String, reason: String },

    #[error("Malformed payload for output '{kind}': {reason}")]
    Payload { kind: String, reason: String },

    // Build errors
    #[error("Build command failed: {command} ({status})")]
    BuildFailed { command: String, status: String },

    #[error("Build did not produce expected output '{kind}': {}", .path.display())]
    BuildOutputMissing { kind: String, path: PathBuf },

    #[error("Failed to spawn build command: {command}")]
    BuildSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StepCacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a registry transport error
    pub fn registry(endpoint: impl Into<String>, reason: impl ToString) -> Self {
        Self::Registry {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Bloom(BloomLoadError::Missing(_)) => Some("Run: stepcache bloom refresh"),
            Self::Bloom(BloomLoadError::ArchMismatch { .. }) => {
                Some("Run: stepcache bloom refresh --arch <arch>")
            }
            Self::Registry { .. } => {
                Some("Check registry.url in the config or pass --registry")
            }
            Self::OutputKeyMismatch { .. } => {
                Some("Bump the step version to invalidate the inconsistent cache entry")
            }
            Self::ConfigInvalid { .. } => Some("Run: stepcache config init --force"),
            _ => None,
        }
    }
}
