//! Batch engine for exhaustive championship scenarios.
//!
//! Turns a season's points CSV into every possible championship outcome:
//! enumerate the non-empty race subsets, score each one, bulk-write the
//! results, then derive per-driver statistics over the persisted set. The
//! serving layer reads the tables (and the query methods in [`store`])
//! that this crate writes; it never computes scenarios itself.

pub mod config;
pub mod importer;
pub mod races;
pub mod stats;
pub mod store;


pub use importer::{process_table, ImportOptions, ImportSummary, DEFAULT_BATCH_SIZE};
pub use races::SeasonSheet;
pub use stats::{compute_season_stats, StatsOutcome};
pub use store::{Database, StorageError};
