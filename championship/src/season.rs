//! Season configuration and race-result entry parsing.
//!
//! Each season is described by a JSON file (`seasons/<year>.json`) listing
//! the driver roster in grid order and the short names of the rounds. The
//! roster seeds new season sheets before any race data exists.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// One driver in a season's roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverEntry {
    /// Three-letter code, e.g. `VER`.
    pub code: String,
    pub name: String,
    pub team: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u32>,
}

/// Static configuration for one season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonConfig {
    pub year: i64,
    /// Roster in source order; this order seeds the points table row order.
    pub drivers: Vec<DriverEntry>,
    /// Round number (1-based) to short round name, e.g. `1 -> "AUS"`.
    #[serde(default)]
    pub rounds: BTreeMap<u32, String>,
}

impl SeasonConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, InputError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| InputError::BadSeasonConfig {
            path: path.to_path_buf(),
            reason: source.to_string(),
        })?;
        serde_json::from_reader(file).map_err(|source| InputError::BadSeasonConfig {
            path: path.to_path_buf(),
            reason: source.to_string(),
        })
    }

    pub fn driver_codes(&self) -> Vec<String> {
        self.drivers.iter().map(|d| d.code.clone()).collect()
    }

    pub fn round_name(&self, round: u32) -> Option<&str> {
        self.rounds.get(&round).map(String::as_str)
    }
}

/// Parse CLI race results of the form `"VER:25,NOR:18,LEC:15"`.
///
/// Codes are trimmed and upper-cased and must be exactly three ASCII
/// letters. Later entries for the same driver overwrite earlier ones.
/// Entry order is preserved for deterministic downstream processing.
pub fn parse_race_results(input: &str) -> Result<Vec<(String, i64)>, InputError> {
    let mut results: Vec<(String, i64)> = Vec::new();

    for entry in input.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }

        let (code, points) = entry.split_once(':').ok_or_else(|| InputError::BadRaceResult {
            entry: entry.to_string(),
            reason: "expected DRIVER:POINTS".to_string(),
        })?;

        let code = code.trim().to_ascii_uppercase();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(InputError::BadRaceResult {
                entry: entry.to_string(),
                reason: format!("'{code}' is not a three-letter driver code"),
            });
        }

        let points: i64 = points.trim().parse().map_err(|_| InputError::BadRaceResult {
            entry: entry.to_string(),
            reason: format!("'{}' is not a points value", points.trim()),
        })?;

        match results.iter_mut().find(|(existing, _)| *existing == code) {
            Some(slot) => slot.1 = points,
            None => results.push((code, points)),
        }
    }

    Ok(results)
}
