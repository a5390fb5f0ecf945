use clap::Subcommand;
use serde::Serialize;

use crate::game::{print_json, rng, Context};
use pulsador_core::{Difficulty, TierSpec};

#[derive(Subcommand)]
pub enum TierAction {
    /// List tiers with their rules and lock state
    List,
    /// Switch the current tier
    Select {
        /// easy, medium or hard
        tier: Difficulty,
    },
}

#[derive(Serialize)]
struct TierRow {
    tier: Difficulty,
    #[serde(flatten)]
    spec: TierSpec,
    unlocked: bool,
    current: bool,
}

pub fn run(action: TierAction) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::open()?;
    let saved = ctx.load_game()?;

    match action {
        TierAction::List => {
            let tiers = ctx.config.tier_table()?;
            let rows: Vec<TierRow> = tiers
                .iter()
                .map(|(tier, spec)| TierRow {
                    tier,
                    spec: *spec,
                    unlocked: saved.state.is_unlocked(tier),
                    current: tier == saved.tier,
                })
                .collect();
            print_json(&rows)?;
        }
        TierAction::Select { tier } => {
            let mut session = ctx.session(saved, rng(None))?;
            let event = session.select_tier(tier)?;
            ctx.save_game(&session.save())?;
            print_json(&event)?;
        }
    }
    Ok(())
}
