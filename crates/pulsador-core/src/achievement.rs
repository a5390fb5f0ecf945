//! Achievement registry.
//!
//! Achievements are a table of `id -> predicate` supplied by the host. The
//! evaluator checks every still-locked entry after each round; adding an
//! achievement never touches the evaluator.
//!
//! Predicates are either declarative [`Condition`]s, which can be loaded from
//! the TOML config, or arbitrary closures registered in code.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Values an achievement predicate may inspect after a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AchievementContext {
    pub score: u64,
    pub streak: u32,
    pub level: u32,
    pub difference_ms: u64,
    pub is_hit: bool,
}

/// Declarative unlock condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    ScoreAtLeast { score: u64 },
    StreakAtLeast { streak: u32 },
    LevelAtLeast { level: u32 },
    /// A hit whose difference is at most `ms`.
    HitWithinMs { ms: u64 },
    /// A hit with zero difference.
    PerfectHit,
}

impl Condition {
    pub fn holds(&self, ctx: &AchievementContext) -> bool {
        match self {
            Condition::ScoreAtLeast { score } => ctx.score >= *score,
            Condition::StreakAtLeast { streak } => ctx.streak >= *streak,
            Condition::LevelAtLeast { level } => ctx.level >= *level,
            Condition::HitWithinMs { ms } => ctx.is_hit && ctx.difference_ms <= *ms,
            Condition::PerfectHit => ctx.is_hit && ctx.difference_ms == 0,
        }
    }
}

/// Serializable achievement definition, as found in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementDef {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub icon: String,
    pub when: Condition,
}

type PredicateFn = dyn Fn(&AchievementContext) -> bool + Send + Sync;

#[derive(Clone)]
enum Predicate {
    Rule(Condition),
    Custom(Arc<PredicateFn>),
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Rule(c) => f.debug_tuple("Rule").field(c).finish(),
            Predicate::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// A registered achievement.
#[derive(Debug, Clone)]
pub struct Achievement {
    pub id: String,
    pub title: String,
    pub icon: String,
    predicate: Predicate,
}

impl Achievement {
    pub fn is_satisfied(&self, ctx: &AchievementContext) -> bool {
        match &self.predicate {
            Predicate::Rule(c) => c.holds(ctx),
            Predicate::Custom(f) => f(ctx),
        }
    }

    /// The declarative condition, if this achievement has one.
    pub fn condition(&self) -> Option<&Condition> {
        match &self.predicate {
            Predicate::Rule(c) => Some(c),
            Predicate::Custom(_) => None,
        }
    }
}

/// Ordered table of achievements with unique ids.
#[derive(Debug, Clone, Default)]
pub struct AchievementRegistry {
    entries: Vec<Achievement>,
}

impl AchievementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Definitions used when the config does not list any.
    pub fn default_defs() -> Vec<AchievementDef> {
        vec![
            AchievementDef {
                id: "scorer".into(),
                title: "1000 points!".into(),
                icon: "🏆".into(),
                when: Condition::ScoreAtLeast { score: 1000 },
            },
            AchievementDef {
                id: "streaker".into(),
                title: "Streak of 5!".into(),
                icon: "🔥".into(),
                when: Condition::StreakAtLeast { streak: 5 },
            },
            AchievementDef {
                id: "veteran".into(),
                title: "Reached level 5".into(),
                icon: "⭐".into(),
                when: Condition::LevelAtLeast { level: 5 },
            },
            AchievementDef {
                id: "sharpshooter".into(),
                title: "Within 50 ms".into(),
                icon: "🎯".into(),
                when: Condition::HitWithinMs { ms: 50 },
            },
        ]
    }

    pub fn defaults() -> Self {
        let mut registry = Self::new();
        for def in Self::default_defs() {
            registry.entries.push(Self::from_def(def));
        }
        registry
    }

    /// Build a registry from config definitions.
    ///
    /// # Errors
    ///
    /// Returns an error if two definitions share an id or an id is blank.
    pub fn from_defs(defs: impl IntoIterator<Item = AchievementDef>) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        for def in defs {
            registry.register(def)?;
        }
        Ok(registry)
    }

    fn from_def(def: AchievementDef) -> Achievement {
        Achievement {
            id: def.id,
            title: def.title,
            icon: def.icon,
            predicate: Predicate::Rule(def.when),
        }
    }

    fn check_id(&self, id: &str) -> Result<(), ConfigError> {
        if id.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "achievements.id".into(),
                message: "achievement id must not be empty".into(),
            });
        }
        if self.get(id).is_some() {
            return Err(ConfigError::InvalidValue {
                key: "achievements.id".into(),
                message: format!("duplicate achievement id '{id}'"),
            });
        }
        Ok(())
    }

    /// Add a declarative achievement.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is blank or already registered.
    pub fn register(&mut self, def: AchievementDef) -> Result<(), ConfigError> {
        self.check_id(&def.id)?;
        self.entries.push(Self::from_def(def));
        Ok(())
    }

    /// Add an achievement backed by an arbitrary predicate.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is blank or already registered.
    pub fn register_fn<F>(
        &mut self,
        id: impl Into<String>,
        title: impl Into<String>,
        predicate: F,
    ) -> Result<(), ConfigError>
    where
        F: Fn(&AchievementContext) -> bool + Send + Sync + 'static,
    {
        let id = id.into();
        self.check_id(&id)?;
        self.entries.push(Achievement {
            id,
            title: title.into(),
            icon: String::new(),
            predicate: Predicate::Custom(Arc::new(predicate)),
        });
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Achievement> {
        self.entries.iter().find(|a| a.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Achievement> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Achievements not in `unlocked` whose predicate holds, in registration order.
    pub fn newly_satisfied<'a>(
        &'a self,
        ctx: &'a AchievementContext,
        unlocked: &'a BTreeSet<String>,
    ) -> impl Iterator<Item = &'a Achievement> + 'a {
        self.entries
            .iter()
            .filter(move |a| !unlocked.contains(&a.id) && a.is_satisfied(ctx))
    }
}
