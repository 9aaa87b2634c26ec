//! Configuration for the titlefight engine.
//!
//! Handles data directory configuration with the following precedence:
//! 1. TITLEFIGHT_DATA_DIR environment variable
//! 2. ~/.config/titlefight/data (production default)
//! 3. ./data (fallback for development)

use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_DIR: &str = ".config/titlefight/data";
const DEV_DATA_DIR: &str = "./data";

/// Get the data directory holding the database, season CSVs, and season
/// configuration files.
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("TITLEFIGHT_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(DEFAULT_CONFIG_DIR);
    }

    PathBuf::from(DEV_DATA_DIR)
}

pub fn database_path(data_dir: &Path) -> PathBuf {
    data_dir.join("titlefight.db")
}

pub fn season_csv_path(data_dir: &Path, season: i64) -> PathBuf {
    data_dir.join(format!("championships_{season}.csv"))
}

pub fn season_config_path(data_dir: &Path, season: i64) -> PathBuf {
    data_dir.join("seasons").join(format!("{season}.json"))
}

/// Resolve the points CSV for a season: the season-specific file wins,
/// the generic `championships.csv` is the fallback.
pub fn resolve_season_csv(data_dir: &Path, season: i64) -> Option<PathBuf> {
    let specific = season_csv_path(data_dir, season);
    if specific.exists() {
        return Some(specific);
    }

    let generic = data_dir.join("championships.csv");
    if generic.exists() {
        return Some(generic);
    }

    None
}
