//! SQLite-based round storage.
//!
//! Provides persistent storage for:
//! - Finished rounds (local history and statistics)
//! - Key-value store for application state (saved game, personal bests)

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::{CoreError, DatabaseError, Result};
use crate::evaluator::{RoundInput, RoundResult};
use crate::history::{HistoryRecord, HistorySink};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRound {
    pub id: i64,
    pub tier: String,
    pub target_ms: u64,
    pub actual_ms: u64,
    pub difference_ms: u64,
    pub points: u64,
    pub outcome: String,
    pub played_at: DateTime<Utc>,
}

impl From<&StoredRound> for HistoryRecord {
    fn from(round: &StoredRound) -> Self {
        HistoryRecord {
            target_seconds: round.target_ms as f64 / 1000.0,
            actual_seconds: round.actual_ms as f64 / 1000.0,
            outcome: round.outcome.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RoundStats {
    pub total_rounds: u64,
    pub hits: u64,
    pub perfect_rounds: u64,
    pub total_points: u64,
    /// Smallest difference among hits.
    pub closest_hit_ms: Option<u64>,
    pub average_difference_ms: f64,
}

/// SQLite database for round storage.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/pulsador/pulsador.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("pulsador.db");
        Self::open_at(&path)
    }

    /// Open (or create) a database file at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS rounds (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                tier          TEXT NOT NULL,
                target_ms     INTEGER NOT NULL,
                actual_ms     INTEGER NOT NULL,
                difference_ms INTEGER NOT NULL,
                points        INTEGER NOT NULL,
                outcome       TEXT NOT NULL,
                played_at     TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_rounds_played_at ON rounds(played_at);",
        )?;
        Ok(())
    }

    /// Record a finished round.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_round(&self, result: &RoundResult, played_at: DateTime<Utc>) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO rounds (tier, target_ms, actual_ms, difference_ms, points, outcome, played_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                result.tier.as_str(),
                result.target_ms as i64,
                result.actual_ms as i64,
                result.difference_ms as i64,
                result.points_awarded as i64,
                result.outcome.as_str(),
                played_at.to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent rounds first, at most `limit`.
    ///
    /// # Errors
    /// Returns an error if the query fails or a stored timestamp is malformed.
    pub fn recent_rounds(&self, limit: usize) -> Result<Vec<StoredRound>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, tier, target_ms, actual_ms, difference_ms, points, outcome, played_at
             FROM rounds
             ORDER BY id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
            ))
        })?;

        let mut rounds = Vec::new();
        for row in rows {
            let (id, tier, target, actual, difference, points, outcome, played_at) = row?;
            let played_at = DateTime::parse_from_rfc3339(&played_at)
                .map_err(|e| DatabaseError::QueryFailed(format!("round {id}: {e}")))?
                .with_timezone(&Utc);
            rounds.push(StoredRound {
                id,
                tier,
                target_ms: target.max(0) as u64,
                actual_ms: actual.max(0) as u64,
                difference_ms: difference.max(0) as u64,
                points: points.max(0) as u64,
                outcome,
                played_at,
            });
        }
        Ok(rounds)
    }

    pub fn round_stats(&self) -> Result<RoundStats> {
        let stats = self.conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN outcome != 'miss' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN outcome = 'perfect' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(points), 0),
                    MIN(CASE WHEN outcome != 'miss' THEN difference_ms END),
                    COALESCE(AVG(difference_ms), 0.0)
             FROM rounds",
            [],
            |row| {
                Ok(RoundStats {
                    total_rounds: row.get::<_, i64>(0)? as u64,
                    hits: row.get::<_, i64>(1)? as u64,
                    perfect_rounds: row.get::<_, i64>(2)? as u64,
                    total_points: row.get::<_, i64>(3)? as u64,
                    closest_hit_ms: row.get::<_, Option<i64>>(4)?.map(|v| v as u64),
                    average_difference_ms: row.get::<_, f64>(5)?,
                })
            },
        )?;
        Ok(stats)
    }

    /// Delete every stored round.
    pub fn clear_rounds(&self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM rounds", [])?)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Read a JSON value from the kv store.
    ///
    /// # Errors
    /// Returns an error if the query fails or the stored JSON does not match `T`.
    pub fn kv_get_json<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Result<Option<T>> {
        match self.kv_get(key)? {
            Some(json) => Ok(Some(serde_json::from_str(&json).map_err(CoreError::Json)?)),
            None => Ok(None),
        }
    }

    /// Store a value in the kv store as JSON.
    pub fn kv_set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.kv_set(key, &json)
    }
}

impl HistorySink for Database {
    fn record(&mut self, _input: &RoundInput, result: &RoundResult) -> Result<()> {
        self.record_round(result, Utc::now())?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<HistoryRecord>> {
        Ok(self
            .recent_rounds(usize::MAX >> 1)?
            .iter()
            .map(HistoryRecord::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::RoundEvaluator;
    use crate::progression::ProgressionState;
    use crate::tier::Difficulty;

    fn play(evaluator: &RoundEvaluator, state: &ProgressionState, target: u64, actual: u64) -> (ProgressionState, RoundResult) {
        evaluator
            .evaluate(state, &RoundInput::new(Difficulty::Easy, target, actual))
            .unwrap()
    }

    #[test]
    fn record_and_query() {
        let mut db = Database::open_memory().unwrap();
        let evaluator = RoundEvaluator::default();
        let state = ProgressionState::new();

        let (state, first) = play(&evaluator, &state, 4000, 4000);
        let (state, second) = play(&evaluator, &state, 5000, 5100);
        let (_, third) = play(&evaluator, &state, 6000, 7000);
        db.record_round(&first, Utc::now()).unwrap();
        db.record_round(&second, Utc::now()).unwrap();
        HistorySink::record(&mut db, &RoundInput::new(Difficulty::Easy, 6000, 7000), &third).unwrap();

        let recent = db.recent_rounds(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].outcome, "miss");
        assert_eq!(recent[1].points, 80);

        let stats = db.round_stats().unwrap();
        assert_eq!(stats.total_rounds, 3);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.perfect_rounds, 1);
        assert_eq!(stats.total_points, 180);
        assert_eq!(stats.closest_hit_ms, Some(0));

        let listed = db.list().unwrap();
        assert_eq!(listed.len(), 3);
        assert_eq!(listed[0].target_seconds, 6.0);
        assert_eq!(listed[2].outcome, "perfect");

        assert_eq!(db.clear_rounds().unwrap(), 3);
        assert_eq!(db.round_stats().unwrap(), RoundStats::default());
    }

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");

        let state = ProgressionState::new();
        db.kv_set_json("state", &state).unwrap();
        assert_eq!(db.kv_get_json::<ProgressionState>("state").unwrap(), Some(state));
        assert!(db.kv_get_json::<ProgressionState>("test").is_err());
    }

    #[test]
    fn opens_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rounds.db");
        {
            let db = Database::open_at(&path).unwrap();
            db.kv_set("k", "v").unwrap();
        }
        let db = Database::open_at(&path).unwrap();
        assert_eq!(db.kv_get("k").unwrap().as_deref(), Some("v"));
    }
}
