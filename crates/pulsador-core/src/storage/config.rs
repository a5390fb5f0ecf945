//! TOML-based game configuration.
//!
//! Stores host preferences including:
//! - Starting difficulty, target granularity and history length
//! - Per-tier overrides of margins, points, ranges and unlock scores
//! - The level curve
//! - The achievement table
//! - An optional remote history endpoint
//!
//! Configuration is stored at `~/.config/pulsador/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::achievement::{AchievementDef, AchievementRegistry};
use crate::error::ConfigError;
use crate::evaluator::RoundEvaluator;
use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::level::LevelCurve;
use crate::target::TargetGenerator;
use crate::tier::{Difficulty, TierSpec, TierTable};

/// General game settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Tier a new game starts on. Must be unlocked at score 0.
    #[serde(default = "default_difficulty")]
    pub default_difficulty: Difficulty,
    /// Rounds kept in the recent-history list. At least 1.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// Target grid in milliseconds (1000 for whole seconds). At least 1.
    #[serde(default = "default_granularity_ms")]
    pub granularity_ms: u64,
    /// Pause between a finished round and the next target.
    #[serde(default = "default_result_delay_ms")]
    pub result_delay_ms: u64,
}

/// Optional overrides for one tier; unset fields keep the built-in value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierOverride {
    #[serde(default)]
    pub margin_ms: Option<u64>,
    #[serde(default)]
    pub max_points: Option<u64>,
    #[serde(default)]
    pub min_duration_ms: Option<u64>,
    #[serde(default)]
    pub max_duration_ms: Option<u64>,
    #[serde(default)]
    pub unlock_score: Option<u64>,
}

impl TierOverride {
    fn apply(&self, base: TierSpec) -> TierSpec {
        TierSpec {
            margin_ms: self.margin_ms.unwrap_or(base.margin_ms),
            max_points: self.max_points.unwrap_or(base.max_points),
            min_duration_ms: self.min_duration_ms.unwrap_or(base.min_duration_ms),
            max_duration_ms: self.max_duration_ms.unwrap_or(base.max_duration_ms),
            unlock_score: self.unlock_score.unwrap_or(base.unlock_score),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TiersConfig {
    #[serde(default)]
    pub easy: TierOverride,
    #[serde(default)]
    pub medium: TierOverride,
    #[serde(default)]
    pub hard: TierOverride,
}

/// History sink configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Remote endpoint accepting `{targetSeconds, actualSeconds, outcome}` records.
    #[serde(default)]
    pub remote_url: Option<String>,
    /// Upload every finished round to `remote_url`.
    #[serde(default)]
    pub upload: bool,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/pulsador/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub tiers: TiersConfig,
    #[serde(default)]
    pub levels: LevelCurve,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default = "AchievementRegistry::default_defs")]
    pub achievements: Vec<AchievementDef>,
}

fn default_difficulty() -> Difficulty {
    Difficulty::Easy
}
fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}
fn default_granularity_ms() -> u64 {
    1
}
fn default_result_delay_ms() -> u64 {
    1500
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            default_difficulty: default_difficulty(),
            history_limit: default_history_limit(),
            granularity_ms: default_granularity_ms(),
            result_delay_ms: default_result_delay_ms(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            game: GameConfig::default(),
            tiers: TiersConfig::default(),
            levels: LevelCurve::default(),
            history: HistoryConfig::default(),
            achievements: AchievementRegistry::default_defs(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    // Unset optional: numbers stay numbers, "none" clears.
                    serde_json::Value::Null => {
                        if value.eq_ignore_ascii_case("none") || value.is_empty() {
                            serde_json::Value::Null
                        } else if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else {
                            serde_json::Value::String(value.into())
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    serde_json::Value::String(_) => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Path of the config file inside the data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be created.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or
    /// validated, or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// See [`Config::load`].
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key. The change is only applied
    /// if the resulting config is valid; call [`Config::save`] to persist it.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the resulting config fails validation.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let candidate: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        candidate.validate()?;
        *self = candidate;
        Ok(())
    }

    /// Check every derived table.
    ///
    /// # Errors
    ///
    /// Returns the first invalid game setting, tier, level curve or
    /// achievement found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, message: &str| ConfigError::InvalidValue {
            key: key.to_string(),
            message: message.to_string(),
        };
        if self.game.history_limit == 0 {
            return Err(invalid("game.history_limit", "must be at least 1"));
        }
        if self.game.granularity_ms == 0 {
            return Err(invalid("game.granularity_ms", "must be at least 1"));
        }

        let tiers = self.tier_table()?;
        let start = self.game.default_difficulty;
        if tiers.get(start).unlock_score > 0 {
            return Err(invalid(
                "game.default_difficulty",
                &format!("{start} is locked for a new game"),
            ));
        }
        self.levels.validate()?;
        AchievementRegistry::from_defs(self.achievements.clone())?;
        Ok(())
    }

    /// Built-in tiers with the configured overrides applied.
    ///
    /// # Errors
    ///
    /// Returns an error if the overrides break the tier ordering.
    pub fn tier_table(&self) -> Result<TierTable, ConfigError> {
        TierTable::new(
            self.tiers.easy.apply(TierSpec::default_for(Difficulty::Easy)),
            self.tiers.medium.apply(TierSpec::default_for(Difficulty::Medium)),
            self.tiers.hard.apply(TierSpec::default_for(Difficulty::Hard)),
        )
    }

    /// Evaluator for the configured tiers, levels and achievements.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the tables is invalid.
    pub fn evaluator(&self) -> Result<RoundEvaluator, ConfigError> {
        RoundEvaluator::new(
            self.tier_table()?,
            self.levels.clone(),
            AchievementRegistry::from_defs(self.achievements.clone())?,
        )
    }

    /// Target generator for the configured tiers and granularity.
    ///
    /// # Errors
    ///
    /// Returns an error if the tier overrides are invalid.
    pub fn target_generator(&self) -> Result<TargetGenerator, ConfigError> {
        Ok(TargetGenerator::new(self.tier_table()?).with_granularity(self.game.granularity_ms))
    }
}
