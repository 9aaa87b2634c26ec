//! SQLite persistence for championship scenarios.
//!
//! The layout mirrors the schema consumed by the serving layer: a primary
//! `championship_results` table, the denormalized `position_results`
//! table, and the derived statistics tables maintained by the stats pass.

mod championship_repo;
mod database;
mod position_repo;
mod stats_repo;

pub use championship_repo::{ChampionshipRecord, ChampionshipRepository};
pub use database::Database;
pub use position_repo::{PositionRecord, PositionRepository};
pub use stats_repo::{DriverStatistics, StatsRepository, WinProbabilityEntry};

/// Errors from the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(String),
}
