//! Game session: the host-side owner of progression.
//!
//! The session is a clock-free state machine. The caller measures how long
//! the control was held and hands the elapsed milliseconds to `release`.
//!
//! ## Round phases
//!
//! ```text
//! Ready -> Playing -> Finished -> Ready
//! ```
//!
//! `start` is only honoured in `Ready`, `release` only in `Playing` and
//! `next_round` only in `Finished`; anything else returns `None`.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::evaluator::{RoundEvaluator, RoundInput, RoundResult};
use crate::events::Event;
use crate::history::RecentHistory;
use crate::progression::{PersonalBests, ProgressionState};
use crate::target::{RandomSource, TargetGenerator};
use crate::tier::Difficulty;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundPhase {
    Ready,
    Playing,
    Finished,
}

/// Persistable part of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedGame {
    pub state: ProgressionState,
    #[serde(default)]
    pub bests: PersonalBests,
    pub tier: Difficulty,
    #[serde(default)]
    pub history: RecentHistory,
}

impl Default for SavedGame {
    fn default() -> Self {
        Self {
            state: ProgressionState::new(),
            bests: PersonalBests::default(),
            tier: Difficulty::Easy,
            history: RecentHistory::default(),
        }
    }
}

/// One player's game.
pub struct GameSession<R: RandomSource> {
    evaluator: RoundEvaluator,
    generator: TargetGenerator,
    rng: R,
    state: ProgressionState,
    bests: PersonalBests,
    history: RecentHistory,
    tier: Difficulty,
    phase: RoundPhase,
    target_ms: u64,
}

impl<R: RandomSource> GameSession<R> {
    /// Fresh game on the easiest tier with a first target drawn.
    pub fn new(evaluator: RoundEvaluator, generator: TargetGenerator, rng: R) -> Self {
        Self::restore(evaluator, generator, rng, SavedGame::default())
    }

    /// Resume a saved game. A saved tier that is no longer unlocked falls
    /// back to the hardest unlocked tier.
    pub fn restore(
        evaluator: RoundEvaluator,
        generator: TargetGenerator,
        mut rng: R,
        saved: SavedGame,
    ) -> Self {
        let tier = if saved.state.is_unlocked(saved.tier) {
            saved.tier
        } else {
            saved.state.highest_tier()
        };
        let target_ms = generator.generate(tier, None, &mut rng);
        Self {
            evaluator,
            generator,
            rng,
            state: saved.state,
            bests: saved.bests,
            history: saved.history,
            tier,
            phase: RoundPhase::Ready,
            target_ms,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn tier(&self) -> Difficulty {
        self.tier
    }

    pub fn target_ms(&self) -> u64 {
        self.target_ms
    }

    pub fn state(&self) -> &ProgressionState {
        &self.state
    }

    pub fn bests(&self) -> &PersonalBests {
        &self.bests
    }

    pub fn history(&self) -> &RecentHistory {
        &self.history
    }

    pub fn evaluator(&self) -> &RoundEvaluator {
        &self.evaluator
    }

    pub fn save(&self) -> SavedGame {
        SavedGame {
            state: self.state.clone(),
            bests: self.bests,
            tier: self.tier,
            history: self.history.clone(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Control pressed.
    pub fn start(&mut self) -> Option<Event> {
        if self.phase != RoundPhase::Ready {
            return None;
        }
        self.phase = RoundPhase::Playing;
        tracing::debug!(tier = %self.tier, target_ms = self.target_ms, "round started");
        Some(Event::RoundStarted {
            tier: self.tier,
            target_ms: self.target_ms,
            at: Utc::now(),
        })
    }

    /// Control released after `elapsed_ms`. Returns the round result and its
    /// events, or `None` when no round was being played.
    ///
    /// # Errors
    ///
    /// Propagates evaluator errors; the session stays in `Playing`.
    pub fn release(&mut self, elapsed_ms: u64) -> Result<Option<(RoundResult, Vec<Event>)>> {
        if self.phase != RoundPhase::Playing {
            return Ok(None);
        }
        let input = RoundInput::new(self.tier, self.target_ms, elapsed_ms);
        let (next, result) = self.evaluator.evaluate(&self.state, &input)?;
        self.state = next;
        self.bests.absorb(&self.state);
        self.history.push(result.clone());
        self.phase = RoundPhase::Finished;

        let achievements = self.evaluator.achievements();
        let events = Event::from_round(
            &result,
            self.state.score,
            self.state.streak,
            |id| achievements.get(id).map(|a| a.title.as_str()),
            Utc::now(),
        );
        Ok(Some((result, events)))
    }

    /// Draw the next target after a finished round.
    pub fn next_round(&mut self) -> Option<Event> {
        if self.phase != RoundPhase::Finished {
            return None;
        }
        Some(self.redraw())
    }

    /// Switch difficulty. Allowed between rounds only.
    ///
    /// # Errors
    ///
    /// Returns `RoundInProgress` while playing and `InvalidTierSelection`
    /// for a locked tier.
    pub fn select_tier(&mut self, tier: Difficulty) -> Result<Event> {
        if self.phase == RoundPhase::Playing {
            return Err(CoreError::RoundInProgress {
                action: "change difficulty",
            });
        }
        self.evaluator.select_tier(&self.state, tier)?;
        self.tier = tier;
        self.redraw();
        tracing::info!(%tier, "difficulty changed");
        Ok(Event::TierChanged {
            tier,
            at: Utc::now(),
        })
    }

    /// Start over. Personal bests survive.
    ///
    /// # Errors
    ///
    /// Returns `RoundInProgress` while playing.
    pub fn reset(&mut self) -> Result<Event> {
        if self.phase == RoundPhase::Playing {
            return Err(CoreError::RoundInProgress { action: "reset" });
        }
        self.state.reset();
        self.history.clear();
        self.tier = Difficulty::Easy;
        self.redraw();
        tracing::info!("game reset");
        Ok(Event::GameReset { at: Utc::now() })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn redraw(&mut self) -> Event {
        self.target_ms = self
            .generator
            .generate(self.tier, Some(self.target_ms), &mut self.rng);
        self.phase = RoundPhase::Ready;
        Event::RoundReady {
            tier: self.tier,
            target_ms: self.target_ms,
            at: Utc::now(),
        }
    }
}
