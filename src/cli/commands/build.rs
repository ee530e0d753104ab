//! Build command - restore from cache or build and publish

use super::load_step;
use crate::bloom::BloomManager;
use crate::cli::args::BuildArgs;
use crate::config::Config;
use crate::error::StepCacheResult;
use crate::executor::BuildExecutor;
use crate::orchestrator::{Orchestrator, Outcome};
use crate::registry::create_registry;
use console::style;
use tracing::debug;

/// Execute the build command
pub async fn execute(args: BuildArgs, config: &Config) -> StepCacheResult<()> {
    let step = load_step(&args.step, config).await?;
    debug!("Loaded step '{}' for {}", step.name, step.arch);

    let registry = create_registry(config);
    let orchestrator = Orchestrator::new(
        &*registry,
        BloomManager::new(config.bloom_path(&step.arch)),
        BuildExecutor::new(config.build.shell.clone()),
    )
    .verify_when_unavailable(args.verify_when_unavailable || config.bloom.verify_when_unavailable);

    match orchestrator.run(&step).await? {
        Outcome::Restored { hash } => {
            println!(
                "{} {} {}",
                style("[CACHED]").green(),
                step.name,
                style(hash).dim()
            );
        }
        Outcome::Built {
            hash,
            elapsed_secs,
            reason,
        } => {
            println!(
                "{} {} in {:.2}s ({}) {}",
                style("[BUILT]").cyan(),
                step.name,
                elapsed_secs,
                reason,
                style(hash).dim()
            );
        }
    }

    Ok(())
}
