mod config;
pub mod database;

pub use config::{Config, GameConfig, HistoryConfig, TierOverride, TiersConfig};
pub use database::{Database, RoundStats, StoredRound};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the data directory, creating it if needed.
///
/// `PULSADOR_DATA_DIR` wins when set. Otherwise `~/.config/pulsador[-dev]/`
/// based on PULSADOR_ENV (set PULSADOR_ENV=dev for the development directory).
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("PULSADOR_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("PULSADOR_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("pulsador-dev")
            } else {
                base_dir.join("pulsador")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
