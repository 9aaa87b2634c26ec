//! Core championship-scenario logic for titlefight.
//!
//! This crate is pure and synchronous: it loads a drivers × races points
//! table, enumerates race subsets, and scores the standings for any subset.
//! Persistence and process wiring live in `titlefight-engine`.

pub mod combinations;
pub mod error;
pub mod season;
pub mod standings;
pub mod table;

pub use combinations::RaceCombinations;
pub use error::InputError;
pub use season::{parse_race_results, DriverEntry, SeasonConfig};
pub use standings::{
    decode_points, decode_rounds, decode_standings, score_subset, ScoredChampionship,
};
pub use table::PointsTable;
