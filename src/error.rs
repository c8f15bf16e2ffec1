//! Error taxonomy for the map pipeline.
//!
//! Every failure is fatal for the request that hit it; nothing here is
//! retried. Callers branch on the variant to tell missing input, missing
//! data and schema mismatches apart.

use std::path::PathBuf;

/// Errors produced while loading datasets or building a map.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    /// A required dataset file does not exist.
    #[error("required file not found: {}", path.display())]
    MissingFile {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// The dataset exists but holds no rows for the requested day.
    #[error("no trip rows for day {day}")]
    EmptyData {
        /// Requested day of month.
        day: u32,
    },

    /// No attribute column of the geometry dataset can serve as the
    /// province join field.
    #[error("no province field found among columns {columns:?}")]
    DetectionFailure {
        /// Columns that were examined.
        columns: Vec<String>,
    },

    /// Two series share no day to compare.
    #[error("the two series have no days in common")]
    NoCommonDays,

    /// A CSV file lacks one of the configured columns.
    #[error("column '{column}' not found in {}", path.display())]
    MissingColumn { path: PathBuf, column: String },

    /// A cell could not be parsed into the expected type.
    #[error("invalid value '{value}' in column '{column}' at line {line} of {}", path.display())]
    InvalidValue {
        path: PathBuf,
        line: u64,
        column: String,
        value: String,
    },

    /// A request or configuration parameter is out of range.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter { name: String, message: String },

    /// The geometry file is not a usable feature collection.
    #[error("invalid geometry dataset: {message}")]
    InvalidGeometry { message: String },

    /// The sequence was stopped at an iteration boundary.
    #[error("operation cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),
}

impl MapError {
    pub(crate) fn invalid_parameter(name: &str, message: impl Into<String>) -> Self {
        MapError::InvalidParameter {
            name: name.to_string(),
            message: message.into(),
        }
    }
}

/// Shorthand for results carrying a [`MapError`].
pub type Result<T> = std::result::Result<T, MapError>;
