//! Build step descriptions
//!
//! A `BuildStep` is the unit of cacheable work: a command plus its declared
//! inputs, outputs and context. It is built once per invocation and never
//! mutated afterwards. `StepFile` is the TOML form read by the CLI.

use crate::error::{StepCacheError, StepCacheResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Target CPU architecture tag
///
/// Cache entries and bloom filters are partitioned by architecture; an entry
/// built for one tag is never served for another.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CpuArch(String);

impl CpuArch {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Architecture of the running process (e.g. `x86_64`, `aarch64`)
    pub fn host() -> Self {
        Self(std::env::consts::ARCH.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CpuArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable description of one build step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStep {
    /// Command line executed by the shell
    pub command: String,

    /// Files whose contents affect the result
    pub dependencies: BTreeSet<PathBuf>,

    /// Output kind tag -> expected output path
    pub outputs: BTreeMap<String, PathBuf>,

    /// Arbitrary context that affects the result (compiler version, flags, ...)
    pub context: BTreeMap<String, String>,

    /// Human-readable name
    pub name: String,

    /// Bumped to invalidate every earlier cache entry for this kind of step
    pub version: i64,

    /// Target architecture
    pub arch: CpuArch,
}

impl BuildStep {
    pub fn new(name: impl Into<String>, command: impl Into<String>, arch: CpuArch) -> Self {
        Self {
            command: command.into(),
            dependencies: BTreeSet::new(),
            outputs: BTreeMap::new(),
            context: BTreeMap::new(),
            name: name.into(),
            version: 0,
            arch,
        }
    }

    pub fn with_dependency(mut self, path: impl Into<PathBuf>) -> Self {
        self.dependencies.insert(path.into());
        self
    }

    pub fn with_output(mut self, kind: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.outputs.insert(kind.into(), path.into());
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn with_version(mut self, version: i64) -> Self {
        self.version = version;
        self
    }

    /// The output kinds a cache hit must provide, no more and no fewer
    pub fn output_kinds(&self) -> BTreeSet<&str> {
        self.outputs.keys().map(String::as_str).collect()
    }

    /// Reject descriptions that cannot be hashed or executed
    pub fn validate(&self) -> StepCacheResult<()> {
        if self.command.trim().is_empty() {
            return Err(StepCacheError::StepInvalid(format!(
                "step '{}' has an empty command",
                self.name
            )));
        }
        if self.outputs.is_empty() {
            return Err(StepCacheError::StepInvalid(format!(
                "step '{}' declares no outputs",
                self.name
            )));
        }
        if let Some(kind) = self.outputs.keys().find(|k| k.trim().is_empty()) {
            return Err(StepCacheError::StepInvalid(format!(
                "step '{}' has an output with an empty kind ({:?})",
                self.name, kind
            )));
        }
        Ok(())
    }
}

/// On-disk step description
///
/// ```toml
/// name = "compile main"
/// command = "cc -c main.c -o main.o"
/// version = 2
/// dependencies = ["main.c", "main.h"]
///
/// [outputs]
/// obj = "main.o"
///
/// [context]
/// cc = "gcc 13.2"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepFile {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub arch: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<PathBuf>,
    pub outputs: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub context: BTreeMap<String, String>,
}

impl StepFile {
    /// Read and parse a step file
    pub async fn load(path: &Path) -> StepCacheResult<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| StepCacheError::StepFile {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        toml::from_str(&content).map_err(|e| StepCacheError::StepFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Convert into a validated `BuildStep`
    ///
    /// `default_arch` applies when the file does not pin an architecture.
    pub fn into_step(self, default_arch: &CpuArch) -> StepCacheResult<BuildStep> {
        let step = BuildStep {
            command: self.command,
            dependencies: self.dependencies.into_iter().collect(),
            outputs: self.outputs,
            context: self.context,
            name: self.name,
            version: self.version,
            arch: self
                .arch
                .map(CpuArch::new)
                .unwrap_or_else(|| default_arch.clone()),
        };
        step.validate()?;
        Ok(step)
    }
}
