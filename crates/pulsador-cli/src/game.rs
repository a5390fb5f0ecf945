//! Shared plumbing for commands: config, database, saved game, archiving.

use std::error::Error;

use pulsador_core::{
    Config, Database, GameSession, HistorySink, RandomSource, RemoteHistory, RoundInput,
    RoundResult, SavedGame,
};
use rand::SeedableRng;
use rand_pcg::Mcg128Xsl64;
use serde::Serialize;

const SAVED_GAME_KEY: &str = "saved_game";

pub struct Context {
    pub config: Config,
    pub db: Database,
}

impl Context {
    pub fn open() -> Result<Self, Box<dyn Error>> {
        Ok(Self {
            config: Config::load()?,
            db: Database::open()?,
        })
    }

    /// The saved game, or a fresh one. History is resized to the configured limit.
    pub fn load_game(&self) -> Result<SavedGame, Box<dyn Error>> {
        let mut saved: SavedGame = self.db.kv_get_json(SAVED_GAME_KEY)?.unwrap_or_default();
        saved.history = saved.history.resized(self.config.game.history_limit);
        Ok(saved)
    }

    pub fn save_game(&self, saved: &SavedGame) -> Result<(), Box<dyn Error>> {
        self.db.kv_set_json(SAVED_GAME_KEY, saved)?;
        Ok(())
    }

    pub fn session<R: RandomSource>(
        &self,
        saved: SavedGame,
        rng: R,
    ) -> Result<GameSession<R>, Box<dyn Error>> {
        Ok(GameSession::restore(
            self.config.evaluator()?,
            self.config.target_generator()?,
            rng,
            saved,
        ))
    }

    /// Store a round locally and, when configured, upload it.
    /// Upload failures are logged, not fatal.
    pub fn archive(&mut self, result: &RoundResult) -> Result<(), Box<dyn Error>> {
        let input = RoundInput::new(result.tier, result.target_ms, result.actual_ms);
        self.db.record(&input, result)?;

        if !self.config.history.upload {
            return Ok(());
        }
        let Some(url) = self.config.history.remote_url.as_deref() else {
            tracing::warn!("history.upload is enabled but history.remote_url is not set");
            return Ok(());
        };
        match RemoteHistory::new(url).and_then(|mut remote| remote.record(&input, result)) {
            Ok(()) => tracing::debug!(%url, "round uploaded"),
            Err(e) => tracing::warn!(%url, error = %e, "round upload failed"),
        }
        Ok(())
    }
}

/// Seeded generator when `seed` is given, entropy otherwise.
pub fn rng(seed: Option<u64>) -> Mcg128Xsl64 {
    match seed {
        Some(seed) => Mcg128Xsl64::seed_from_u64(seed),
        None => Mcg128Xsl64::from_entropy(),
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
