use thiserror::Error;

use crate::types::Field;

/// Errors raised while loading sources, reading the region table, or
/// querying a dataset.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("field '{field}' is not present in the loaded dataset")]
    SchemaMismatch { field: Field },

    #[error("criteria must set '{0}' for this comparison")]
    MissingCriterion(&'static str),

    #[error("required column '{0}' is missing from the source file")]
    MissingColumn(String),

    #[error("unknown region label '{0}'")]
    UnknownRegion(String),

    #[error("region table error: {0}")]
    RegionConfig(String),

    #[error("source is not valid {0}")]
    Encoding(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;
