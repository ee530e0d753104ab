//! Hash command - print a step's input hash

use super::load_step;
use crate::cli::args::HashArgs;
use crate::config::Config;
use crate::error::StepCacheResult;
use crate::hash::compute_hash;

/// Execute the hash command
pub async fn execute(args: HashArgs, config: &Config) -> StepCacheResult<()> {
    let step = load_step(&args.step, config).await?;
    println!("{}", compute_hash(&step)?);
    Ok(())
}
