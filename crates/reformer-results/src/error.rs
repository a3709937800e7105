use thiserror::Error;

/// Failures while shaping or exporting simulation results.
#[derive(Debug, Error)]
pub enum ResultsError {
    #[error("{id} not in expected list of names {expected}")]
    UnknownTable { id: String, expected: String },
    #[error("{table}: missing result series `{key}`")]
    MissingSeries { table: String, key: String },
    #[error("{table}: series `{key}` has no column {column}")]
    MissingColumn {
        table: String,
        key: String,
        column: usize,
    },
    #[error("{table}: value `{value}` in `{key}` is not a number")]
    NotNumeric {
        table: String,
        key: String,
        value: String,
    },
    #[error("invalid results JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
