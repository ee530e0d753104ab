//! Build execution
//!
//! Runs a step's command through the shell, times it with the wall clock and
//! collects the declared outputs. A missing output aborts before anything is
//! uploaded.

use crate::error::{StepCacheError, StepCacheResult};
use crate::registry::OutputFiles;
use crate::step::BuildStep;
use std::process::Stdio;
use std::time::Instant;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, info};

/// Result of a successful build
#[derive(Debug, Clone)]
pub struct BuildOutput {
    /// Wall-clock seconds spent in the command
    pub elapsed_secs: f64,
    /// Output kind -> file contents
    pub files: OutputFiles,
}

/// Runs build commands
pub struct BuildExecutor {
    shell: String,
}

impl BuildExecutor {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }

    /// Execute the step and read back every expected output
    pub async fn run(&self, step: &BuildStep) -> StepCacheResult<BuildOutput> {
        info!("Building '{}'", step.name);
        debug!("Executing: {} -c {:?}", self.shell, step.command);

        let started = Instant::now();
        let status = Command::new(&self.shell)
            .arg("-c")
            .arg(&step.command)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| StepCacheError::BuildSpawn {
                command: step.command.clone(),
                source: e,
            })?;
        let elapsed_secs = started.elapsed().as_secs_f64();

        if !status.success() {
            let status = match status.code() {
                Some(code) => format!("exit code {}", code),
                None => "terminated by signal".to_string(),
            };
            return Err(StepCacheError::BuildFailed {
                command: step.command.clone(),
                status,
            });
        }

        debug!("'{}' finished in {:.3}s", step.name, elapsed_secs);

        // Check every output before reading any of them
        for (kind, path) in &step.outputs {
            let exists = fs::try_exists(path).await.map_err(|e| {
                StepCacheError::io(format!("checking build output {}", path.display()), e)
            })?;
            if !exists {
                return Err(StepCacheError::BuildOutputMissing {
                    kind: kind.clone(),
                    path: path.clone(),
                });
            }
        }

        let mut files = OutputFiles::new();
        for (kind, path) in &step.outputs {
            let content = fs::read(path).await.map_err(|e| {
                StepCacheError::io(format!("reading build output {}", path.display()), e)
            })?;
            files.insert(kind.clone(), content);
        }

        Ok(BuildOutput {
            elapsed_secs,
            files,
        })
    }
}

impl Default for BuildExecutor {
    fn default() -> Self {
        Self::new("sh")
    }
}
