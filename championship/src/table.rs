//! The drivers × races points table.
//!
//! The source format is a plain comma-separated table: the first column is
//! the driver code, the remaining columns carry one integer point total per
//! race. No quoting or embedded commas occur in this data, so the reader
//! splits lines directly rather than pulling in a full CSV parser.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::InputError;

/// Immutable points matrix with its aligned driver list.
///
/// Row `i` of the matrix belongs to `drivers()[i]`; the driver order is the
/// source row order and is load-bearing (it breaks ties in standings).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointsTable {
    drivers: Vec<String>,
    scores: Vec<i64>,
    num_races: usize,
}

impl PointsTable {
    /// Read a points table from a CSV file.
    ///
    /// The first line is a header and is skipped; its width determines the
    /// number of races.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, InputError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| InputError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

        let mut lines = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|source| InputError::Unreadable {
                path: path.to_path_buf(),
                source,
            })?;
            lines.push(line);
        }

        Self::parse_lines(&lines)
    }

    /// Parse a points table from an in-memory CSV string.
    pub fn parse(src: &str) -> Result<Self, InputError> {
        let lines: Vec<String> = src.lines().map(ToString::to_string).collect();
        Self::parse_lines(&lines)
    }

    fn parse_lines(lines: &[String]) -> Result<Self, InputError> {
        let mut rows = lines
            .iter()
            .filter(|line| !line.trim().is_empty());

        let header = rows.next().ok_or(InputError::NoRows)?;
        let num_races = header.split(',').count().saturating_sub(1);

        let mut drivers = Vec::new();
        let mut scores = Vec::new();

        for row in rows {
            let mut fields = row.split(',');
            let code = fields
                .next()
                .map(normalize_driver_code)
                .unwrap_or_default();
            if code.is_empty() {
                continue;
            }
            drivers.push(code);

            // Coerce anything non-numeric to 0; pad short rows, drop extras.
            let mut row_scores = fields.map(coerce_points);
            for _ in 0..num_races {
                scores.push(row_scores.next().unwrap_or(0));
            }
        }

        if drivers.is_empty() {
            return Err(InputError::NoRows);
        }

        Ok(Self {
            drivers,
            scores,
            num_races,
        })
    }

    pub fn drivers(&self) -> &[String] {
        &self.drivers
    }

    pub fn num_drivers(&self) -> usize {
        self.drivers.len()
    }

    pub fn num_races(&self) -> usize {
        self.num_races
    }

    /// All per-race scores for one driver, in race order.
    pub fn row(&self, driver: usize) -> &[i64] {
        let start = driver * self.num_races;
        &self.scores[start..start + self.num_races]
    }
}

/// Trim and upper-case a driver code from the source table.
fn normalize_driver_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// Coerce a points cell to an integer; blank or non-numeric cells become 0.
fn coerce_points(raw: &str) -> i64 {
    let raw = raw.trim();
    match raw.parse::<i64>() {
        Ok(v) => v,
        // The source occasionally carries fractional totals (half points).
        Err(_) => raw.parse::<f64>().map(|v| v as i64).unwrap_or(0),
    }
}
