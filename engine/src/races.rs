//! Editing the per-season race-points CSV.
//!
//! Live seasons grow race by race: `add-race` merges one round of results
//! into `championships_<year>.csv`, `import-races` overlays a whole file.
//! The sheet is the canonical input: the database is always rebuilt from
//! it, never edited in place.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use championship::{InputError, PointsTable};

/// In-memory copy of one season's points CSV.
///
/// Driver order is preserved from the roster/file because it is the
/// standings tie-break; rounds may be sparse until [`SeasonSheet::save`]
/// zero-fills them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeasonSheet {
    drivers: Vec<String>,
    points: BTreeMap<String, BTreeMap<u32, i64>>,
}

impl SeasonSheet {
    /// Empty sheet seeded with a roster, for seasons with no data yet.
    pub fn with_roster(roster: &[String]) -> Self {
        let mut sheet = Self::default();
        for code in roster {
            sheet.ensure_driver(code);
        }
        sheet
    }

    /// Load an existing sheet; a missing file yields an empty sheet.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, InputError> {
        let path = path.as_ref();
        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(InputError::Unreadable {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let mut lines = source.lines().filter(|line| !line.trim().is_empty());
        let Some(header) = lines.next() else {
            return Ok(Self::default());
        };

        // Header carries the round numbers; non-numeric columns are ignored.
        let rounds: Vec<Option<u32>> = header
            .split(',')
            .skip(1)
            .map(|field| field.trim().parse().ok())
            .collect();

        let mut sheet = Self::default();
        for line in lines {
            let mut fields = line.split(',');
            let code = fields.next().unwrap_or("").trim().to_ascii_uppercase();
            if code.is_empty() {
                continue;
            }
            sheet.ensure_driver(&code);
            for (round, value) in rounds.iter().zip(fields) {
                if let Some(round) = round {
                    let points = value.trim().parse().unwrap_or(0);
                    sheet.set(&code, *round, points);
                }
            }
        }

        Ok(sheet)
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }

    pub fn drivers(&self) -> &[String] {
        &self.drivers
    }

    /// Highest round with any data, 0 for an empty sheet.
    pub fn max_round(&self) -> u32 {
        self.points
            .values()
            .flat_map(|rounds| rounds.keys().copied())
            .max()
            .unwrap_or(0)
    }

    pub fn ensure_driver(&mut self, code: &str) {
        if !self.drivers.iter().any(|d| d == code) {
            self.drivers.push(code.to_string());
            self.points.insert(code.to_string(), BTreeMap::new());
        }
    }

    pub fn set(&mut self, code: &str, round: u32, points: i64) {
        self.ensure_driver(code);
        self.points
            .entry(code.to_string())
            .or_default()
            .insert(round, points);
    }

    pub fn get(&self, code: &str, round: u32) -> i64 {
        self.points
            .get(code)
            .and_then(|rounds| rounds.get(&round))
            .copied()
            .unwrap_or(0)
    }

    /// Record one round of results. Drivers without an entry score 0 for
    /// the round; unknown drivers are appended to the grid.
    pub fn apply_race(&mut self, round: u32, results: &[(String, i64)]) {
        for (code, points) in results {
            self.set(code, round, *points);
        }
        for code in &self.drivers {
            if let Some(rounds) = self.points.get_mut(code) {
                rounds.entry(round).or_insert(0);
            }
        }
    }

    /// Overlay a whole points table; its rounds overwrite existing data.
    pub fn merge_table(&mut self, table: &PointsTable) {
        for (index, code) in table.drivers().iter().enumerate() {
            self.ensure_driver(code);
            for (race, &points) in table.row(index).iter().enumerate() {
                self.set(code, race as u32 + 1, points);
            }
        }
    }

    /// Write the sheet back out, zero-filling every round up to the
    /// highest one recorded so the table stays rectangular.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), std::io::Error> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let max_round = self.max_round();
        let mut writer = BufWriter::new(File::create(path)?);

        write!(writer, "Driver")?;
        for round in 1..=max_round {
            write!(writer, ",{round}")?;
        }
        writeln!(writer)?;

        for code in &self.drivers {
            write!(writer, "{code}")?;
            for round in 1..=max_round {
                write!(writer, ",{}", self.get(code, round))?;
            }
            writeln!(writer)?;
        }

        writer.flush()
    }
}
