//! Score -> level mapping.
//!
//! Levels are a monotone step function of cumulative score. Two shapes are
//! supported: a flat number of points per level, or a table of named ranks
//! keyed by absolute score thresholds.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One named rank in a threshold table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rank {
    pub name: String,
    pub min_score: u64,
}

/// Mapping from cumulative score to a level starting at 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LevelCurve {
    /// `level = 1 + score / points_per_level`
    Linear { points_per_level: u64 },
    /// Level N is the N-th rank whose `min_score` has been reached.
    Thresholds { ranks: Vec<Rank> },
}

impl Default for LevelCurve {
    fn default() -> Self {
        LevelCurve::Linear {
            points_per_level: 1000,
        }
    }
}

impl LevelCurve {
    /// Named ranks used when a threshold curve is requested without a table.
    pub fn named_ranks() -> Self {
        let ranks = [
            ("Novice", 0),
            ("Apprentice", 500),
            ("Steady Hand", 1500),
            ("Metronome", 3000),
            ("Clockwork", 6000),
            ("Atomic Clock", 10000),
        ]
        .into_iter()
        .map(|(name, min_score)| Rank {
            name: name.to_string(),
            min_score,
        })
        .collect();
        LevelCurve::Thresholds { ranks }
    }

    /// Check that the curve is well-formed.
    ///
    /// # Errors
    ///
    /// Returns an error if `points_per_level` is zero, or the rank table is
    /// empty, does not start at 0 or is not strictly increasing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: &str| ConfigError::InvalidValue {
            key: "levels".into(),
            message: message.to_string(),
        };
        match self {
            LevelCurve::Linear { points_per_level } => {
                if *points_per_level == 0 {
                    return Err(invalid("points_per_level must be positive"));
                }
            }
            LevelCurve::Thresholds { ranks } => {
                match ranks.first() {
                    None => return Err(invalid("at least one rank is required")),
                    Some(first) if first.min_score != 0 => {
                        return Err(invalid("the first rank must start at score 0"))
                    }
                    Some(_) => {}
                }
                if ranks.windows(2).any(|w| w[1].min_score <= w[0].min_score) {
                    return Err(invalid("rank thresholds must be strictly increasing"));
                }
            }
        }
        Ok(())
    }

    pub fn level_for(&self, score: u64) -> u32 {
        let level = match self {
            LevelCurve::Linear { points_per_level } => {
                1 + score / (*points_per_level).max(1)
            }
            LevelCurve::Thresholds { ranks } => {
                ranks.iter().take_while(|r| score >= r.min_score).count().max(1) as u64
            }
        };
        u32::try_from(level).unwrap_or(u32::MAX)
    }

    /// Display name of `level`, if the curve has names.
    pub fn rank_name(&self, level: u32) -> Option<&str> {
        match self {
            LevelCurve::Linear { .. } => None,
            LevelCurve::Thresholds { ranks } => ranks
                .get((level as usize).checked_sub(1)?)
                .map(|r| r.name.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_curve_steps_every_thousand() {
        let curve = LevelCurve::default();
        assert_eq!(curve.level_for(0), 1);
        assert_eq!(curve.level_for(999), 1);
        assert_eq!(curve.level_for(1000), 2);
        assert_eq!(curve.level_for(4500), 5);
    }

    #[test]
    fn threshold_curve_uses_ranks() {
        let curve = LevelCurve::named_ranks();
        curve.validate().unwrap();
        assert_eq!(curve.level_for(0), 1);
        assert_eq!(curve.level_for(1499), 2);
        assert_eq!(curve.level_for(1500), 3);
        assert_eq!(curve.level_for(u64::MAX), 6);
        assert_eq!(curve.rank_name(3), Some("Steady Hand"));
        assert_eq!(curve.rank_name(0), None);
        assert_eq!(LevelCurve::default().rank_name(1), None);
    }

    #[test]
    fn rejects_malformed_curves() {
        assert!(LevelCurve::Linear { points_per_level: 0 }.validate().is_err());
        assert!(LevelCurve::Thresholds { ranks: vec![] }.validate().is_err());
        let ranks = vec![
            Rank { name: "a".into(), min_score: 0 },
            Rank { name: "b".into(), min_score: 0 },
        ];
        assert!(LevelCurve::Thresholds { ranks }.validate().is_err());
        let ranks = vec![Rank { name: "a".into(), min_score: 10 }];
        assert!(LevelCurve::Thresholds { ranks }.validate().is_err());
    }

    #[test]
    fn level_is_monotone_in_score() {
        for curve in [LevelCurve::default(), LevelCurve::named_ranks()] {
            let mut last = 0;
            for score in (0..20_000).step_by(37) {
                let level = curve.level_for(score);
                assert!(level >= last);
                last = level;
            }
        }
    }
}
