//! Input-side error taxonomy.

use std::path::PathBuf;

/// Errors raised while reading or interpreting source race data.
///
/// All of these surface before anything is written to storage.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    /// The source table could not be read at all.
    #[error("failed to read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The source table parsed but contained no data rows.
    #[error("points table has no data rows")]
    NoRows,

    /// A season configuration file was missing or malformed.
    #[error("season config {path}: {reason}")]
    BadSeasonConfig { path: PathBuf, reason: String },

    /// A `DRIVER:POINTS` race-result entry could not be parsed.
    #[error("invalid race result entry '{entry}': {reason}")]
    BadRaceResult { entry: String, reason: String },

    /// A persisted CSV field failed to decode back into its domain value.
    #[error("malformed {field} field '{value}'")]
    BadEncodedField { field: &'static str, value: String },
}
