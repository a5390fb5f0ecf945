use chrono::Utc;
use clap::Args;
use serde::Serialize;

use crate::game::{print_json, Context};
use pulsador_core::{Difficulty, Event, RoundInput, RoundResult};

#[derive(Args)]
pub struct RoundArgs {
    /// Target duration in milliseconds
    #[arg(long)]
    target: u64,
    /// Measured hold duration in milliseconds
    #[arg(long)]
    actual: u64,
    /// Tier to score against (defaults to the saved tier)
    #[arg(long)]
    tier: Option<Difficulty>,
}

#[derive(Serialize)]
struct RoundReport {
    result: RoundResult,
    events: Vec<Event>,
}

/// Score one externally timed round against the saved game.
pub fn run(args: RoundArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut ctx = Context::open()?;
    let mut saved = ctx.load_game()?;
    let evaluator = ctx.config.evaluator()?;

    let tier = args.tier.unwrap_or(saved.tier);
    let input = RoundInput::new(tier, args.target, args.actual);
    let (next, result) = evaluator.evaluate(&saved.state, &input)?;

    saved.state = next;
    saved.tier = tier;
    saved.bests.absorb(&saved.state);
    saved.history.push(result.clone());

    let achievements = evaluator.achievements();
    let events = Event::from_round(
        &result,
        saved.state.score,
        saved.state.streak,
        |id| achievements.get(id).map(|a| a.title.as_str()),
        Utc::now(),
    );

    ctx.archive(&result)?;
    ctx.save_game(&saved)?;
    print_json(&RoundReport { result, events })
}
