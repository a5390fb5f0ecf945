//! # Pulsador Core Library
//!
//! This library provides the game logic for Pulsador, a press-and-hold timing
//! game: the player holds a control and tries to release it as close as
//! possible to a random target duration. All operations are available via a
//! standalone CLI binary; any graphical front end is a thin layer over the
//! same core library.
//!
//! ## Architecture
//!
//! - **Engine**: pure functions. [`TargetGenerator`] draws targets and
//!   [`RoundEvaluator`] turns a finished round into the next
//!   [`ProgressionState`] plus a [`RoundResult`].
//! - **Session**: [`GameSession`] owns the mutable state and the
//!   `Ready -> Playing -> Finished` round phases
//! - **Storage**: SQLite round history and TOML-based configuration
//! - **History**: pluggable sinks, including a remote HTTP backend
//!
//! ## Key Components
//!
//! - [`RoundEvaluator`]: scoring, streaks, levels, unlocks
//! - [`AchievementRegistry`]: host-supplied achievement predicates
//! - [`Config`]: application configuration management
//! - [`HistorySink`]: trait for round archives

pub mod achievement;
pub mod error;
pub mod evaluator;
pub mod events;
pub mod history;
pub mod level;
pub mod progression;
pub mod session;
pub mod storage;
pub mod target;
pub mod tier;

pub use achievement::{Achievement, AchievementContext, AchievementDef, AchievementRegistry, Condition};
pub use error::{ConfigError, CoreError, DatabaseError, HistoryError, ValidationError};
pub use evaluator::{Outcome, RoundEvaluator, RoundInput, RoundResult};
pub use events::Event;
pub use history::{HistoryRecord, HistorySink, RecentHistory, RemoteHistory};
pub use level::{LevelCurve, Rank};
pub use progression::{PersonalBests, ProgressionState};
pub use session::{GameSession, RoundPhase, SavedGame};
pub use storage::{Config, Database};
pub use target::{RandomSource, ScriptedSource, TargetGenerator};
pub use tier::{Difficulty, TierSpec, TierTable};
