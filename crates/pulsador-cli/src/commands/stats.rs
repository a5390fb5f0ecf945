use serde::Serialize;

use crate::game::{print_json, Context};
use pulsador_core::storage::RoundStats;
use pulsador_core::{Difficulty, PersonalBests, ProgressionState, RoundResult};

#[derive(Serialize)]
struct StatsReport<'a> {
    progression: &'a ProgressionState,
    rank: Option<&'a str>,
    tier: Difficulty,
    hit_rate: f64,
    bests: PersonalBests,
    last_round: Option<&'a RoundResult>,
    rounds: RoundStats,
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::open()?;
    let saved = ctx.load_game()?;

    let report = StatsReport {
        progression: &saved.state,
        rank: ctx.config.levels.rank_name(saved.state.level),
        tier: saved.tier,
        hit_rate: saved.state.hit_rate(),
        bests: saved.bests,
        last_round: saved.history.latest(),
        rounds: ctx.db.round_stats()?,
    };
    print_json(&report)
}
