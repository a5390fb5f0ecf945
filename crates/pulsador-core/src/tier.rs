//! Difficulty tiers.
//!
//! A tier fixes the hit margin, the points for a perfect hit, the range
//! targets are drawn from and the cumulative score that unlocks it.
//! The table is validated once at construction so the evaluator can rely on
//! margins shrinking and rewards growing from Easy to Hard.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ValidationError};

/// Closed set of difficulty tiers, ordered Easy < Medium < Hard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    fn index(&self) -> usize {
        match self {
            Difficulty::Easy => 0,
            Difficulty::Medium => 1,
            Difficulty::Hard => 2,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(ValidationError::InvalidValue {
                field: "difficulty".into(),
                message: format!("expected easy, medium or hard, got '{other}'"),
            }),
        }
    }
}

/// Numeric parameters of one tier. All durations are milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierSpec {
    /// Largest difference still counted as a hit.
    pub margin_ms: u64,
    /// Points for a zero-difference hit.
    pub max_points: u64,
    /// Inclusive lower bound for generated targets.
    pub min_duration_ms: u64,
    /// Exclusive upper bound for generated targets.
    pub max_duration_ms: u64,
    /// Cumulative score required before the tier can be played.
    pub unlock_score: u64,
}

impl TierSpec {
    pub fn default_for(tier: Difficulty) -> Self {
        match tier {
            Difficulty::Easy => TierSpec {
                margin_ms: 500,
                max_points: 100,
                min_duration_ms: 3000,
                max_duration_ms: 8000,
                unlock_score: 0,
            },
            Difficulty::Medium => TierSpec {
                margin_ms: 300,
                max_points: 200,
                min_duration_ms: 2000,
                max_duration_ms: 6000,
                unlock_score: 1000,
            },
            Difficulty::Hard => TierSpec {
                margin_ms: 150,
                max_points: 300,
                min_duration_ms: 1000,
                max_duration_ms: 4000,
                unlock_score: 2500,
            },
        }
    }
}

/// Upper bound for `margin_ms` and `max_points`.
pub const MAX_TIER_VALUE: u64 = u32::MAX as u64;

/// Validated table of all three tiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierTable {
    specs: [TierSpec; 3],
}

impl Default for TierTable {
    fn default() -> Self {
        Self {
            specs: Difficulty::ALL.map(TierSpec::default_for),
        }
    }
}

impl TierTable {
    /// Build a table, checking the ordering invariants between tiers.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the offending tier when a
    /// spec is degenerate or the Easy -> Hard progression is violated.
    pub fn new(easy: TierSpec, medium: TierSpec, hard: TierSpec) -> Result<Self, ConfigError> {
        let specs = [easy, medium, hard];

        for tier in Difficulty::ALL {
            let spec = &specs[tier.index()];
            let invalid = |message: &str| ConfigError::InvalidValue {
                key: format!("tiers.{tier}"),
                message: message.to_string(),
            };
            if spec.margin_ms == 0 {
                return Err(invalid("margin_ms must be positive"));
            }
            if spec.max_points == 0 {
                return Err(invalid("max_points must be positive"));
            }
            if spec.margin_ms > MAX_TIER_VALUE || spec.max_points > MAX_TIER_VALUE {
                return Err(invalid("margin_ms and max_points must fit in 32 bits"));
            }
            if spec.min_duration_ms == 0 {
                return Err(invalid("min_duration_ms must be positive"));
            }
            if spec.min_duration_ms >= spec.max_duration_ms {
                return Err(invalid("min_duration_ms must be below max_duration_ms"));
            }
        }

        if specs[0].unlock_score != 0 {
            return Err(ConfigError::InvalidValue {
                key: "tiers.easy.unlock_score".into(),
                message: "the easiest tier must be unlocked from the start".into(),
            });
        }

        for pair in [(Difficulty::Easy, Difficulty::Medium), (Difficulty::Medium, Difficulty::Hard)] {
            let (lower, upper) = (&specs[pair.0.index()], &specs[pair.1.index()]);
            let key = format!("tiers.{}", pair.1);
            if upper.margin_ms >= lower.margin_ms {
                return Err(ConfigError::InvalidValue {
                    key,
                    message: format!("margin_ms must be smaller than {}'s", pair.0),
                });
            }
            if upper.max_points <= lower.max_points {
                return Err(ConfigError::InvalidValue {
                    key,
                    message: format!("max_points must be larger than {}'s", pair.0),
                });
            }
            if upper.unlock_score < lower.unlock_score {
                return Err(ConfigError::InvalidValue {
                    key,
                    message: format!("unlock_score must not be below {}'s", pair.0),
                });
            }
        }

        Ok(Self { specs })
    }

    pub fn get(&self, tier: Difficulty) -> &TierSpec {
        &self.specs[tier.index()]
    }

    /// Tiers unlocked at `score`, easiest first.
    pub fn available_at(&self, score: u64) -> Vec<Difficulty> {
        Difficulty::ALL
            .into_iter()
            .filter(|t| score >= self.get(*t).unlock_score)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Difficulty, &TierSpec)> {
        Difficulty::ALL.into_iter().map(move |t| (t, self.get(t)))
    }
}
