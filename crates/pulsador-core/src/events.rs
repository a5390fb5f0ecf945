use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::evaluator::{Outcome, RoundResult};
use crate::tier::Difficulty;

/// Every state change in a game produces an Event.
/// The CLI prints them; a GUI would render them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A new target is waiting for the player.
    RoundReady {
        tier: Difficulty,
        target_ms: u64,
        at: DateTime<Utc>,
    },
    /// The control is being held.
    RoundStarted {
        tier: Difficulty,
        target_ms: u64,
        at: DateTime<Utc>,
    },
    RoundFinished {
        tier: Difficulty,
        target_ms: u64,
        actual_ms: u64,
        difference_ms: u64,
        points: u64,
        outcome: Outcome,
        score: u64,
        streak: u32,
        at: DateTime<Utc>,
    },
    LevelUp {
        level: u32,
        at: DateTime<Utc>,
    },
    TierUnlocked {
        tier: Difficulty,
        at: DateTime<Utc>,
    },
    AchievementUnlocked {
        id: String,
        title: String,
        at: DateTime<Utc>,
    },
    TierChanged {
        tier: Difficulty,
        at: DateTime<Utc>,
    },
    GameReset {
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Expand a round result into its events, `RoundFinished` first.
    ///
    /// `titles` resolves achievement ids to display titles; unknown ids fall
    /// back to the id itself.
    pub fn from_round<'a, F>(
        result: &RoundResult,
        score: u64,
        streak: u32,
        titles: F,
        at: DateTime<Utc>,
    ) -> Vec<Event>
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let mut events = vec![Event::RoundFinished {
            tier: result.tier,
            target_ms: result.target_ms,
            actual_ms: result.actual_ms,
            difference_ms: result.difference_ms,
            points: result.points_awarded,
            outcome: result.outcome,
            score,
            streak,
            at,
        }];
        if result.leveled_up {
            events.push(Event::LevelUp {
                level: result.level,
                at,
            });
        }
        events.extend(
            result
                .newly_unlocked_tiers
                .iter()
                .map(|tier| Event::TierUnlocked { tier: *tier, at }),
        );
        events.extend(result.newly_unlocked_achievements.iter().map(|id| {
            Event::AchievementUnlocked {
                id: id.clone(),
                title: titles(id).map_or_else(|| id.clone(), str::to_string),
                at,
            }
        }));
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn round_expands_into_tagged_events() {
        let result = RoundResult {
            tier: Difficulty::Easy,
            target_ms: 4000,
            actual_ms: 4000,
            difference_ms: 0,
            is_hit: true,
            points_awarded: 100,
            outcome: Outcome::Perfect,
            level: 2,
            leveled_up: true,
            newly_unlocked_tiers: BTreeSet::from([Difficulty::Medium]),
            newly_unlocked_achievements: BTreeSet::from(["scorer".to_string(), "mystery".to_string()]),
        };
        let at = Utc::now();
        let events = Event::from_round(
            &result,
            1000,
            1,
            |id| (id == "scorer").then_some("1000 points!"),
            at,
        );
        assert_eq!(events.len(), 5);
        assert!(matches!(events[0], Event::RoundFinished { points: 100, .. }));
        assert!(matches!(events[1], Event::LevelUp { level: 2, .. }));
        assert!(matches!(events[2], Event::TierUnlocked { tier: Difficulty::Medium, .. }));
        match &events[4] {
            Event::AchievementUnlocked { id, title, .. } => {
                assert_eq!(id, "scorer");
                assert_eq!(title, "1000 points!");
            }
            other => panic!("unexpected event {other:?}"),
        }
        match &events[3] {
            Event::AchievementUnlocked { title, .. } => assert_eq!(title, "mystery"),
            other => panic!("unexpected event {other:?}"),
        }

        let json = serde_json::to_value(&events[1]).unwrap();
        assert_eq!(json["type"], "LevelUp");
    }
}
