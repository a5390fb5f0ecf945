//! Round evaluation and progression.
//!
//! [`RoundEvaluator::evaluate`] turns a finished round plus the current
//! [`ProgressionState`] into the next state and a [`RoundResult`]. It has no
//! clock and no side effects besides tracing.
//!
//! ## Scoring
//!
//! ```text
//! difference = |target - actual|
//! hit        = difference <= margin
//! points     = round((1 - difference / margin) * max_points)   (hits only)
//! ```
//!
//! A difference equal to the margin is a hit worth zero points: it still
//! extends the streak.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::achievement::{AchievementContext, AchievementRegistry};
use crate::error::{ConfigError, CoreError, Result, ValidationError};
use crate::level::LevelCurve;
use crate::progression::ProgressionState;
use crate::tier::{Difficulty, TierSpec, TierTable};

/// Timings of one completed round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundInput {
    pub target_ms: u64,
    pub actual_ms: u64,
    pub tier: Difficulty,
}

impl RoundInput {
    pub fn new(tier: Difficulty, target_ms: u64, actual_ms: u64) -> Self {
        Self {
            target_ms,
            actual_ms,
            tier,
        }
    }
}

/// Coarse classification of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Hit worth the tier's full points.
    Perfect,
    Hit,
    Miss,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Perfect => "perfect",
            Outcome::Hit => "hit",
            Outcome::Miss => "miss",
        }
    }
}

/// Everything the presentation layer needs to render and archive a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundResult {
    pub tier: Difficulty,
    pub target_ms: u64,
    pub actual_ms: u64,
    pub difference_ms: u64,
    pub is_hit: bool,
    pub points_awarded: u64,
    pub outcome: Outcome,
    /// Level after the round.
    pub level: u32,
    pub leveled_up: bool,
    pub newly_unlocked_tiers: BTreeSet<Difficulty>,
    pub newly_unlocked_achievements: BTreeSet<String>,
}

/// Points for a round on `spec`, rounding half up in integer arithmetic.
pub fn points_for(difference_ms: u64, spec: &TierSpec) -> u64 {
    if difference_ms > spec.margin_ms {
        return 0;
    }
    let margin = spec.margin_ms as u128;
    let product = (spec.margin_ms - difference_ms) as u128 * spec.max_points as u128;
    let (quotient, rest) = (product / margin, product % margin);
    let rounded = if 2 * rest >= margin { quotient + 1 } else { quotient };
    // remaining <= margin, so the result never exceeds max_points.
    rounded as u64
}

/// The progression engine.
#[derive(Debug, Clone)]
pub struct RoundEvaluator {
    tiers: TierTable,
    levels: LevelCurve,
    achievements: AchievementRegistry,
}

impl Default for RoundEvaluator {
    fn default() -> Self {
        Self {
            tiers: TierTable::default(),
            levels: LevelCurve::default(),
            achievements: AchievementRegistry::defaults(),
        }
    }
}

impl RoundEvaluator {
    /// # Errors
    ///
    /// Returns an error if the level curve is malformed.
    pub fn new(
        tiers: TierTable,
        levels: LevelCurve,
        achievements: AchievementRegistry,
    ) -> Result<Self, ConfigError> {
        levels.validate()?;
        Ok(Self {
            tiers,
            levels,
            achievements,
        })
    }

    pub fn tiers(&self) -> &TierTable {
        &self.tiers
    }

    pub fn levels(&self) -> &LevelCurve {
        &self.levels
    }

    pub fn achievements(&self) -> &AchievementRegistry {
        &self.achievements
    }

    /// Guard for tier selectors: the tier's spec if `state` has unlocked it.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidTierSelection` for a locked tier.
    pub fn select_tier(&self, state: &ProgressionState, tier: Difficulty) -> Result<&TierSpec> {
        let spec = self.tiers.get(tier);
        if !state.is_unlocked(tier) {
            return Err(CoreError::InvalidTierSelection {
                tier,
                required: spec.unlock_score,
                score: state.score,
            });
        }
        Ok(spec)
    }

    /// Score one round.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a zero target and `InvalidTierSelection`
    /// if the round was played on a tier `state` has not unlocked. The
    /// caller's state is untouched in both cases.
    pub fn evaluate(
        &self,
        state: &ProgressionState,
        input: &RoundInput,
    ) -> Result<(ProgressionState, RoundResult)> {
        if input.target_ms == 0 {
            return Err(ValidationError::ZeroDuration { field: "target_ms" }.into());
        }
        let spec = self.select_tier(state, input.tier)?;

        let difference_ms = input.target_ms.abs_diff(input.actual_ms);
        let is_hit = difference_ms <= spec.margin_ms;
        let points_awarded = points_for(difference_ms, spec);

        let mut next = state.clone();
        next.rounds_played += 1;
        if is_hit {
            next.hits += 1;
            next.streak = state.streak.saturating_add(1);
            next.best_streak = state.best_streak.max(next.streak);
        } else {
            next.streak = 0;
        }
        next.score = state.score.saturating_add(points_awarded);
        next.level = self.levels.level_for(next.score);
        let leveled_up = next.level > state.level;

        let newly_unlocked_tiers: BTreeSet<Difficulty> = self
            .tiers
            .iter()
            .filter(|(tier, spec)| !state.is_unlocked(*tier) && next.score >= spec.unlock_score)
            .map(|(tier, _)| tier)
            .collect();
        next.unlocked_tiers.extend(newly_unlocked_tiers.iter().copied());

        let ctx = AchievementContext {
            score: next.score,
            streak: next.streak,
            level: next.level,
            difference_ms,
            is_hit,
        };
        let newly_unlocked_achievements: BTreeSet<String> = self
            .achievements
            .newly_satisfied(&ctx, &state.unlocked_achievements)
            .map(|a| a.id.clone())
            .collect();
        next.unlocked_achievements
            .extend(newly_unlocked_achievements.iter().cloned());

        let outcome = if !is_hit {
            Outcome::Miss
        } else if points_awarded == spec.max_points {
            Outcome::Perfect
        } else {
            Outcome::Hit
        };

        tracing::debug!(
            tier = %input.tier,
            target_ms = input.target_ms,
            actual_ms = input.actual_ms,
            difference_ms,
            points = points_awarded,
            score = next.score,
            streak = next.streak,
            "round evaluated"
        );
        if leveled_up {
            tracing::info!(from = state.level, to = next.level, "level up");
        }
        for tier in &newly_unlocked_tiers {
            tracing::info!(%tier, score = next.score, "difficulty unlocked");
        }
        for id in &newly_unlocked_achievements {
            tracing::info!(achievement = %id, "achievement unlocked");
        }

        let result = RoundResult {
            tier: input.tier,
            target_ms: input.target_ms,
            actual_ms: input.actual_ms,
            difference_ms,
            is_hit,
            points_awarded,
            outcome,
            level: next.level,
            leveled_up,
            newly_unlocked_tiers,
            newly_unlocked_achievements,
        };
        Ok((next, result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn medium_state() -> ProgressionState {
        let mut state = ProgressionState::new();
        state.unlocked_tiers.insert(Difficulty::Medium);
        state.score = 1000;
        state.level = 2;
        state
    }

    #[test]
    fn points_round_half_up() {
        let medium = TierSpec::default_for(Difficulty::Medium);
        assert_eq!(points_for(0, &medium), 200);
        assert_eq!(points_for(100, &medium), 133);
        assert_eq!(points_for(300, &medium), 0);
        assert_eq!(points_for(301, &medium), 0);
        // 0.5 * 100 = 50 exactly; 250/500 of easy's range.
        let easy = TierSpec::default_for(Difficulty::Easy);
        assert_eq!(points_for(250, &easy), 50);
        // 1 - 3/500 = 0.994 -> 99.4 -> 99; 1 - 1/500 -> 99.8 -> 100
        assert_eq!(points_for(3, &easy), 99);
        assert_eq!(points_for(1, &easy), 100);
    }

    #[test]
    fn points_do_not_overflow_at_extreme_specs() {
        let spec = TierSpec {
            margin_ms: u64::MAX,
            max_points: u64::MAX,
            min_duration_ms: 1,
            max_duration_ms: 2,
            unlock_score: 0,
        };
        assert_eq!(points_for(0, &spec), u64::MAX);
        assert_eq!(points_for(u64::MAX, &spec), 0);
        assert_eq!(points_for(u64::MAX / 2, &spec), u64::MAX / 2 + 1);
    }

    #[test]
    fn medium_hit_awards_133() {
        let evaluator = RoundEvaluator::default();
        let (next, result) = evaluator
            .evaluate(&medium_state(), &RoundInput::new(Difficulty::Medium, 5000, 5100))
            .unwrap();
        assert_eq!(result.difference_ms, 100);
        assert!(result.is_hit);
        assert_eq!(result.points_awarded, 133);
        assert_eq!(result.outcome, Outcome::Hit);
        assert_eq!(next.score, 1133);
        assert_eq!(next.streak, 1);
        assert_eq!(next.hits, 1);
    }

    #[test]
    fn medium_miss_resets_streak() {
        let evaluator = RoundEvaluator::default();
        let mut state = medium_state();
        state.streak = 4;
        state.best_streak = 4;
        let (next, result) = evaluator
            .evaluate(&state, &RoundInput::new(Difficulty::Medium, 5000, 5600))
            .unwrap();
        assert_eq!(result.difference_ms, 600);
        assert!(!result.is_hit);
        assert_eq!(result.points_awarded, 0);
        assert_eq!(result.outcome, Outcome::Miss);
        assert_eq!(next.streak, 0);
        assert_eq!(next.best_streak, 4);
        assert_eq!(next.score, state.score);
        assert_eq!(next.rounds_played, 1);
        assert_eq!(next.hits, 0);
    }

    #[test]
    fn boundary_difference_is_zero_point_hit() {
        let evaluator = RoundEvaluator::default();
        let (next, result) = evaluator
            .evaluate(&ProgressionState::new(), &RoundInput::new(Difficulty::Easy, 4000, 4500))
            .unwrap();
        assert!(result.is_hit);
        assert_eq!(result.points_awarded, 0);
        assert_eq!(result.outcome, Outcome::Hit);
        assert_eq!(next.streak, 1);
    }

    #[test]
    fn perfect_hit_awards_max_points() {
        let evaluator = RoundEvaluator::default();
        let (_, result) = evaluator
            .evaluate(&ProgressionState::new(), &RoundInput::new(Difficulty::Easy, 4321, 4321))
            .unwrap();
        assert_eq!(result.points_awarded, 100);
        assert_eq!(result.outcome, Outcome::Perfect);
    }

    #[test]
    fn crossing_unlock_score_unlocks_medium_only() {
        let evaluator = RoundEvaluator::default();
        let mut state = ProgressionState::new();
        state.score = 950;
        // Easy target with 100 ms off: round(0.8 * 100) = 80 -> 1030
        let (next, result) = evaluator
            .evaluate(&state, &RoundInput::new(Difficulty::Easy, 5000, 5100))
            .unwrap();
        assert_eq!(next.score, 1030);
        assert_eq!(result.newly_unlocked_tiers, BTreeSet::from([Difficulty::Medium]));
        assert!(next.is_unlocked(Difficulty::Medium));
        assert!(!next.is_unlocked(Difficulty::Hard));
        assert!(result.leveled_up);
        assert_eq!(result.level, 2);
    }

    #[test]
    fn locked_tier_is_rejected_without_touching_state() {
        let evaluator = RoundEvaluator::default();
        let state = ProgressionState::new();
        let err = evaluator
            .evaluate(&state, &RoundInput::new(Difficulty::Hard, 2000, 2000))
            .unwrap_err();
        match err {
            CoreError::InvalidTierSelection { tier, required, score } => {
                assert_eq!(tier, Difficulty::Hard);
                assert_eq!(required, 2500);
                assert_eq!(score, 0);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(evaluator.select_tier(&state, Difficulty::Easy).is_ok());
        assert!(evaluator.select_tier(&state, Difficulty::Medium).is_err());
    }

    #[test]
    fn zero_target_is_invalid_input() {
        let evaluator = RoundEvaluator::default();
        let err = evaluator
            .evaluate(&ProgressionState::new(), &RoundInput::new(Difficulty::Easy, 0, 100))
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidInput(ValidationError::ZeroDuration { field: "target_ms" })
        ));
    }

    #[test]
    fn zero_actual_and_overlong_holds_are_valid() {
        let evaluator = RoundEvaluator::default();
        let state = ProgressionState::new();
        let (_, result) = evaluator
            .evaluate(&state, &RoundInput::new(Difficulty::Easy, 3000, 0))
            .unwrap();
        assert_eq!(result.difference_ms, 3000);
        let (_, result) = evaluator
            .evaluate(&state, &RoundInput::new(Difficulty::Easy, 7999, 60_000))
            .unwrap();
        assert_eq!(result.difference_ms, 52_001);
        assert!(!result.is_hit);
    }

    #[test]
    fn rejects_malformed_level_curve() {
        let result = RoundEvaluator::new(
            TierTable::default(),
            LevelCurve::Linear { points_per_level: 0 },
            AchievementRegistry::defaults(),
        );
        assert!(result.is_err());
    }
}
