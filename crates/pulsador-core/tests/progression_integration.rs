//! Integration tests for round evaluation and progression.
//!
//! Covers the worked scenarios (Medium hit/miss, Medium unlock, streak
//! achievement) and property tests for the scoring invariants.

use std::collections::BTreeSet;

use proptest::prelude::*;
use pulsador_core::{
    AchievementRegistry, Difficulty, LevelCurve, ProgressionState, RoundEvaluator, RoundInput,
    TierTable,
};

fn with_medium(score: u64) -> ProgressionState {
    let mut state = ProgressionState::new();
    state.score = score;
    state.level = LevelCurve::default().level_for(score);
    state.unlocked_tiers.insert(Difficulty::Medium);
    state
}

#[test]
fn test_medium_hit_scores_133() {
    let evaluator = RoundEvaluator::default();
    let (next, result) = evaluator
        .evaluate(&with_medium(1000), &RoundInput::new(Difficulty::Medium, 5000, 5100))
        .unwrap();

    assert_eq!(result.difference_ms, 100);
    assert!(result.is_hit);
    assert_eq!(result.points_awarded, 133);
    assert_eq!(next.score, 1133);
}

#[test]
fn test_medium_miss_resets_streak() {
    let evaluator = RoundEvaluator::default();
    let mut state = with_medium(1000);
    state.streak = 3;
    state.best_streak = 3;

    let (next, result) = evaluator
        .evaluate(&state, &RoundInput::new(Difficulty::Medium, 5000, 5600))
        .unwrap();

    assert_eq!(result.difference_ms, 600);
    assert!(!result.is_hit);
    assert_eq!(result.points_awarded, 0);
    assert_eq!(next.streak, 0);
    assert_eq!(next.best_streak, 3);
}

#[test]
fn test_score_crossing_1000_unlocks_medium() {
    // Medium itself is locked at 950, so the crossing round is played on Easy.
    let evaluator = RoundEvaluator::default();
    let mut state = ProgressionState::new();
    state.score = 950;

    let (next, result) = evaluator
        .evaluate(&state, &RoundInput::new(Difficulty::Easy, 4000, 4000))
        .unwrap();
    assert_eq!(next.score, 1050);
    assert_eq!(result.newly_unlocked_tiers, BTreeSet::from([Difficulty::Medium]));
    assert!(!next.is_unlocked(Difficulty::Hard));

    // Already unlocked tiers are not reported again.
    let (_, again) = evaluator
        .evaluate(&next, &RoundInput::new(Difficulty::Easy, 4000, 4000))
        .unwrap();
    assert!(again.newly_unlocked_tiers.is_empty());
}

#[test]
fn test_streak_achievement_fires_once_on_fifth_hit() {
    let evaluator = RoundEvaluator::default();
    let mut state = ProgressionState::new();

    for round in 1..=7u32 {
        let (next, result) = evaluator
            .evaluate(&state, &RoundInput::new(Difficulty::Easy, 5000, 5200))
            .unwrap();
        assert_eq!(next.streak, round);
        let fired = result.newly_unlocked_achievements.contains("streaker");
        assert_eq!(fired, round == 5, "round {round}");
        state = next;
    }
    assert!(state.unlocked_achievements.contains("streaker"));
}

#[test]
fn test_hard_tier_unlocks_at_2500() {
    let evaluator = RoundEvaluator::default();
    let mut state = ProgressionState::new();
    let mut unlocked_at = Vec::new();

    for _ in 0..30 {
        let (next, result) = evaluator
            .evaluate(&state, &RoundInput::new(Difficulty::Easy, 3500, 3500))
            .unwrap();
        for tier in &result.newly_unlocked_tiers {
            unlocked_at.push((*tier, next.score));
        }
        state = next;
    }

    assert_eq!(
        unlocked_at,
        vec![(Difficulty::Medium, 1000), (Difficulty::Hard, 2500)]
    );
    assert_eq!(state.level, 4);
    assert!(state.unlocked_achievements.contains("scorer"));
}

#[test]
fn test_custom_registry_and_threshold_levels() {
    let mut achievements = AchievementRegistry::new();
    achievements
        .register_fn("overshoot", "Held far too long", |c| !c.is_hit && c.difference_ms > 10_000)
        .unwrap();
    let evaluator =
        RoundEvaluator::new(TierTable::default(), LevelCurve::named_ranks(), achievements).unwrap();

    let (next, result) = evaluator
        .evaluate(&ProgressionState::new(), &RoundInput::new(Difficulty::Easy, 3000, 20_000))
        .unwrap();
    assert_eq!(result.newly_unlocked_achievements, BTreeSet::from(["overshoot".to_string()]));
    assert_eq!(next.level, 1);
    assert_eq!(evaluator.levels().rank_name(next.level), Some("Novice"));
}

fn tier_strategy() -> impl Strategy<Value = Difficulty> {
    prop_oneof![
        Just(Difficulty::Easy),
        Just(Difficulty::Medium),
        Just(Difficulty::Hard),
    ]
}

fn round_strategy() -> impl Strategy<Value = RoundInput> {
    (tier_strategy(), 1u64..10_000, 0u64..12_000)
        .prop_map(|(tier, target, actual)| RoundInput::new(tier, target, actual))
}

proptest! {
    #[test]
    fn prop_single_round_invariants(round in round_strategy(), score in 0u64..5000, streak in 0u32..20) {
        let evaluator = RoundEvaluator::default();
        let mut state = ProgressionState::new();
        state.score = score;
        state.streak = streak;
        state.best_streak = streak;
        state.level = evaluator.levels().level_for(score);
        state.unlocked_tiers = Difficulty::ALL.into_iter().collect();

        let spec = *evaluator.tiers().get(round.tier);
        let (next, result) = evaluator.evaluate(&state, &round).unwrap();

        prop_assert!(result.points_awarded <= spec.max_points);
        if !result.is_hit {
            prop_assert_eq!(result.points_awarded, 0);
            prop_assert_eq!(next.streak, 0);
        } else {
            prop_assert_eq!(next.streak, streak + 1);
        }
        prop_assert_eq!(next.score, score + result.points_awarded);
        prop_assert!(next.best_streak >= state.best_streak);
        prop_assert!(next.level >= state.level);
        prop_assert_eq!(result.difference_ms, round.target_ms.abs_diff(round.actual_ms));
    }

    #[test]
    fn prop_unlocks_never_shrink_and_report_once(rounds in proptest::collection::vec(round_strategy(), 1..60)) {
        let evaluator = RoundEvaluator::default();
        let mut state = ProgressionState::new();
        let mut reported_achievements = BTreeSet::new();
        let mut reported_tiers = BTreeSet::new();

        for round in rounds {
            let before = state.clone();
            let Ok((next, result)) = evaluator.evaluate(&state, &round) else {
                // Locked tiers are rejected without changing anything.
                prop_assert!(!state.is_unlocked(round.tier));
                continue;
            };

            prop_assert!(next.score >= before.score);
            prop_assert!(next.unlocked_tiers.is_superset(&before.unlocked_tiers));
            prop_assert!(next.unlocked_achievements.is_superset(&before.unlocked_achievements));
            for id in &result.newly_unlocked_achievements {
                prop_assert!(reported_achievements.insert(id.clone()), "{} reported twice", id);
            }
            for tier in &result.newly_unlocked_tiers {
                prop_assert!(reported_tiers.insert(*tier));
            }
            prop_assert!(next.unlocked_tiers.contains(&Difficulty::Easy));
            state = next;
        }
    }
}
