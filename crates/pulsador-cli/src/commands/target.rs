use clap::Args;
use serde::Serialize;

use crate::game::{print_json, rng, Context};
use pulsador_core::Difficulty;

#[derive(Args)]
pub struct TargetArgs {
    /// Tier to draw for (defaults to the saved tier)
    #[arg(long)]
    tier: Option<Difficulty>,
    /// Previous target, never repeated
    #[arg(long)]
    previous: Option<u64>,
    /// Seed for a reproducible draw
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Serialize)]
struct TargetReport {
    tier: Difficulty,
    target_ms: u64,
    target_seconds: f64,
    granularity_ms: u64,
}

pub fn run(args: TargetArgs) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::open()?;
    let saved = ctx.load_game()?;
    let evaluator = ctx.config.evaluator()?;
    let generator = ctx.config.target_generator()?;

    let tier = args.tier.unwrap_or(saved.tier);
    evaluator.select_tier(&saved.state, tier)?;

    let target_ms = generator.generate(tier, args.previous, &mut rng(args.seed));
    print_json(&TargetReport {
        tier,
        target_ms,
        target_seconds: target_ms as f64 / 1000.0,
        granularity_ms: generator.granularity_ms(),
    })
}
