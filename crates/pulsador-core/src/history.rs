//! Round history sinks.
//!
//! A history sink archives finished rounds and lists them back. The engine
//! never depends on one; hosts pick whichever fits:
//!
//! - [`RecentHistory`]: bounded in-memory list, most recent first
//! - [`crate::storage::Database`]: local SQLite table
//! - [`RemoteHistory`]: HTTP endpoint accepting and listing JSON records

use std::collections::VecDeque;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{HistoryError, Result};
use crate::evaluator::{RoundInput, RoundResult};

/// Wire record shared with remote history backends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub target_seconds: f64,
    pub actual_seconds: f64,
    pub outcome: String,
}

impl HistoryRecord {
    pub fn from_round(result: &RoundResult) -> Self {
        Self {
            target_seconds: result.target_ms as f64 / 1000.0,
            actual_seconds: result.actual_ms as f64 / 1000.0,
            outcome: result.outcome.as_str().to_string(),
        }
    }
}

/// Archive of finished rounds.
pub trait HistorySink {
    /// Store one round.
    fn record(&mut self, input: &RoundInput, result: &RoundResult) -> Result<()>;

    /// Previously recorded rounds.
    fn list(&self) -> Result<Vec<HistoryRecord>>;
}

/// Default number of rounds kept by [`RecentHistory`].
pub const DEFAULT_HISTORY_LIMIT: usize = 5;

/// Bounded in-memory history, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentHistory {
    capacity: usize,
    entries: VecDeque<RoundResult>,
}

impl Default for RecentHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_LIMIT)
    }
}

impl RecentHistory {
    /// A capacity of zero is treated as one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Same entries under a new capacity, dropping the oldest if it shrank.
    pub fn resized(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self.entries.truncate(self.capacity);
        self
    }

    pub fn push(&mut self, result: RoundResult) {
        self.entries.push_front(result);
        self.entries.truncate(self.capacity);
    }

    pub fn entries(&self) -> impl Iterator<Item = &RoundResult> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&RoundResult> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl HistorySink for RecentHistory {
    fn record(&mut self, _input: &RoundInput, result: &RoundResult) -> Result<()> {
        self.push(result.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<HistoryRecord>> {
        Ok(self.entries.iter().map(HistoryRecord::from_round).collect())
    }
}

/// History kept by a remote HTTP service.
///
/// `POST <endpoint>` with a [`HistoryRecord`] body stores a round and
/// `GET <endpoint>` returns a JSON array of records. Requests run on a
/// private current-thread runtime, so this sink must not be used from
/// inside another tokio runtime.
pub struct RemoteHistory {
    endpoint: Url,
    client: Client,
    runtime: tokio::runtime::Runtime,
}

impl RemoteHistory {
    /// # Errors
    ///
    /// Returns an error if the endpoint is not an http(s) URL or the runtime
    /// cannot be created.
    pub fn new(endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|_| HistoryError::InvalidEndpoint(endpoint.to_string()))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(HistoryError::InvalidEndpoint(endpoint.to_string()).into());
        }
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            endpoint,
            client: Client::new(),
            runtime,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn request_error(&self, err: reqwest::Error) -> HistoryError {
        HistoryError::Request {
            endpoint: self.endpoint.to_string(),
            message: err.to_string(),
        }
    }

    fn check_status(&self, status: reqwest::StatusCode) -> Result<(), HistoryError> {
        if !status.is_success() {
            return Err(HistoryError::Status {
                endpoint: self.endpoint.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

impl HistorySink for RemoteHistory {
    fn record(&mut self, _input: &RoundInput, result: &RoundResult) -> Result<()> {
        let record = HistoryRecord::from_round(result);
        let resp = self
            .runtime
            .block_on(self.client.post(self.endpoint.clone()).json(&record).send())
            .map_err(|e| self.request_error(e))?;
        if let Err(e) = self.check_status(resp.status()) {
            tracing::warn!(endpoint = %self.endpoint, error = %e, "history upload rejected");
            return Err(e.into());
        }
        Ok(())
    }

    fn list(&self) -> Result<Vec<HistoryRecord>> {
        let records = self.runtime.block_on(async {
            let resp = self
                .client
                .get(self.endpoint.clone())
                .send()
                .await
                .map_err(|e| self.request_error(e))?;
            self.check_status(resp.status())?;
            resp.json::<Vec<HistoryRecord>>()
                .await
                .map_err(|e| self.request_error(e))
        })?;
        Ok(records)
    }
}
