//! Bloom command - refresh or inspect the local filter snapshot

use super::load_step;
use crate::bloom::BloomManager;
use crate::cli::args::{BloomAction, BloomArgs};
use crate::config::Config;
use crate::error::StepCacheResult;
use crate::hash::compute_hash;
use crate::registry::create_registry;
use crate::step::CpuArch;
use console::style;
use std::path::Path;

/// Execute the bloom command
pub async fn execute(args: BloomArgs, config: &Config) -> StepCacheResult<()> {
    match args.action {
        BloomAction::Refresh { arch } => {
            let arch = arch.map(CpuArch::new).unwrap_or_else(|| config.arch());
            refresh(config, &arch).await
        }
        BloomAction::Check { step } => check(config, &step).await,
    }
}

async fn refresh(config: &Config, arch: &CpuArch) -> StepCacheResult<()> {
    let registry = create_registry(config);
    let manager = BloomManager::new(config.bloom_path(arch));

    let filter = manager.refresh(&*registry, arch).await?;

    println!(
        "{} Bloom filter for {} saved to {}",
        style("[OK]").green(),
        arch,
        manager.path().display()
    );
    println!(
        "  {} bits, {} hashes, {:.1}% full",
        filter.num_bits(),
        filter.num_hashes(),
        filter.fill_ratio() * 100.0
    );
    Ok(())
}

async fn check(config: &Config, step_path: &Path) -> StepCacheResult<()> {
    let step = load_step(step_path, config).await?;
    let hash = compute_hash(&step)?;
    let manager = BloomManager::new(config.bloom_path(&step.arch));

    // Load failures are reported, not swallowed, when asked directly
    let filter = manager.load(&step.arch).await?;

    if filter.contains(&hash) {
        println!("{} {} possibly cached", style("[HIT]").green(), hash);
    } else {
        println!("{} {} not cached", style("[MISS]").yellow(), hash);
    }
    Ok(())
}
