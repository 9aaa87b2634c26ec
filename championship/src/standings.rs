//! Scoring a race subset into championship standings.

use crate::error::InputError;
use crate::table::PointsTable;

/// The standings produced by scoring one race subset.
///
/// `standings[i]` finished in position `i + 1` with `points[i]` points;
/// both vectors cover every driver in the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredChampionship {
    /// The scored subset, 0-based ascending race indices.
    pub rounds: Vec<usize>,
    /// Driver codes in descending points order.
    pub standings: Vec<String>,
    /// Point totals aligned with `standings`.
    pub points: Vec<i64>,
}

impl ScoredChampionship {
    pub fn num_races(&self) -> usize {
        self.rounds.len()
    }

    pub fn winner(&self) -> &str {
        &self.standings[0]
    }

    /// Winning margin over second place; `None` for a single-driver table.
    pub fn margin(&self) -> Option<i64> {
        match self.points.as_slice() {
            [first, second, ..] => Some(first - second),
            _ => None,
        }
    }

    /// The subset as the persisted `rounds` string: ascending, 1-based.
    pub fn rounds_csv(&self) -> String {
        join_csv(self.rounds.iter().map(|&race| race + 1))
    }

    pub fn standings_csv(&self) -> String {
        self.standings.join(",")
    }

    pub fn points_csv(&self) -> String {
        join_csv(self.points.iter())
    }
}

/// Score one race subset: sum each driver's points over exactly the subset
/// columns and rank descending.
///
/// Ties keep the table's original driver order (stable sort on descending
/// score), matching the source data's published tie behavior.
///
/// The caller guarantees every index in `subset` is a valid race column.
pub fn score_subset(table: &PointsTable, subset: &[usize]) -> ScoredChampionship {
    let totals: Vec<i64> = (0..table.num_drivers())
        .map(|driver| {
            let row = table.row(driver);
            subset.iter().map(|&race| row[race]).sum()
        })
        .collect();

    let mut order: Vec<usize> = (0..table.num_drivers()).collect();
    order.sort_by_key(|&driver| std::cmp::Reverse(totals[driver]));

    ScoredChampionship {
        rounds: subset.to_vec(),
        standings: order
            .iter()
            .map(|&driver| table.drivers()[driver].clone())
            .collect(),
        points: order.iter().map(|&driver| totals[driver]).collect(),
    }
}

fn join_csv<I>(values: I) -> String
where
    I: IntoIterator,
    I::Item: ToString,
{
    values
        .into_iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Decode a persisted `rounds` string back into 0-based race indices.
pub fn decode_rounds(rounds: &str) -> Result<Vec<usize>, InputError> {
    rounds
        .split(',')
        .map(|field| {
            field
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|round| round.checked_sub(1))
                .ok_or_else(|| InputError::BadEncodedField {
                    field: "rounds",
                    value: rounds.to_string(),
                })
        })
        .collect()
}

/// Decode a persisted `standings` string back into driver codes.
pub fn decode_standings(standings: &str) -> Vec<String> {
    standings.split(',').map(|code| code.trim().to_string()).collect()
}

/// Decode a persisted `points` string back into point totals.
pub fn decode_points(points: &str) -> Result<Vec<i64>, InputError> {
    points
        .split(',')
        .map(|field| {
            field
                .trim()
                .parse::<i64>()
                .map_err(|_| InputError::BadEncodedField {
                    field: "points",
                    value: points.to_string(),
                })
        })
        .collect()
}
