//! Player progression state.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::tier::Difficulty;

/// Snapshot of a player's progress.
///
/// Treated as an immutable value: the evaluator reads one snapshot and
/// returns the next. Only the host keeps a mutable instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressionState {
    pub score: u64,
    pub streak: u32,
    pub best_streak: u32,
    pub level: u32,
    pub unlocked_tiers: BTreeSet<Difficulty>,
    pub unlocked_achievements: BTreeSet<String>,
    #[serde(default)]
    pub rounds_played: u64,
    #[serde(default)]
    pub hits: u64,
}

impl Default for ProgressionState {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressionState {
    pub fn new() -> Self {
        Self {
            score: 0,
            streak: 0,
            best_streak: 0,
            level: 1,
            unlocked_tiers: BTreeSet::from([Difficulty::Easy]),
            unlocked_achievements: BTreeSet::new(),
            rounds_played: 0,
            hits: 0,
        }
    }

    /// Return to the initial values.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn is_unlocked(&self, tier: Difficulty) -> bool {
        self.unlocked_tiers.contains(&tier)
    }

    /// Hardest unlocked tier.
    pub fn highest_tier(&self) -> Difficulty {
        self.unlocked_tiers
            .iter()
            .next_back()
            .copied()
            .unwrap_or(Difficulty::Easy)
    }

    /// Share of rounds that were hits, 0.0 .. 1.0.
    pub fn hit_rate(&self) -> f64 {
        if self.rounds_played == 0 {
            return 0.0;
        }
        self.hits as f64 / self.rounds_played as f64
    }
}

/// Records that survive a reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalBests {
    pub high_score: u64,
    pub best_streak: u32,
}

impl PersonalBests {
    /// Fold a state into the records. Returns true if a record was beaten.
    pub fn absorb(&mut self, state: &ProgressionState) -> bool {
        let mut improved = false;
        if state.score > self.high_score {
            self.high_score = state.score;
            improved = true;
        }
        if state.best_streak > self.best_streak {
            self.best_streak = state.best_streak;
            improved = true;
        }
        improved
    }
}
