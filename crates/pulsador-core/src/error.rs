//! Core error types for pulsador-core.
//!
//! This module defines the error hierarchy using thiserror. Engine errors
//! (`InvalidTierSelection`, `InvalidInput`) are local and recoverable; the
//! host decides whether to surface them to the player.

use std::path::PathBuf;
use thiserror::Error;

use crate::tier::Difficulty;

/// Core error type for pulsador-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A round was played, or a selector asked for, a tier that is still locked.
    #[error("Difficulty '{tier}' is locked: requires {required} points, have {score}")]
    InvalidTierSelection {
        tier: Difficulty,
        required: u64,
        score: u64,
    },

    /// Round timings or other caller-supplied values are out of domain.
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] ValidationError),

    /// The requested change is not allowed while the control is held.
    #[error("Cannot {action} while a round is in progress")]
    RoundInProgress { action: &'static str },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// History sink errors
    #[error("History error: {0}")]
    History(#[from] HistoryError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Validation errors for round input.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// A duration that must be positive was zero.
    #[error("'{field}' must be a positive number of milliseconds")]
    ZeroDuration { field: &'static str },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Could not determine or create the data directory
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Errors raised by history sinks.
#[derive(Error, Debug)]
pub enum HistoryError {
    /// The remote endpoint could not be reached or returned garbage.
    #[error("Request to {endpoint} failed: {message}")]
    Request { endpoint: String, message: String },

    /// The remote endpoint answered with a non-success status.
    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },

    /// The endpoint URL is not usable.
    #[error("Invalid history endpoint '{0}'")]
    InvalidEndpoint(String),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
