use reformer_common::{FieldParseError, Year};
use thiserror::Error;

/// Fatal failures while turning overrides into a complete reform.
#[derive(Debug, Error)]
pub enum ReformError {
    #[error(transparent)]
    Parse(#[from] FieldParseError),
    #[error("{key}: no parameter named `{param}` in the schema")]
    UnknownParameter { key: String, param: String },
    #[error("{param}: the first value must not be blank")]
    BlankLeadingValue { param: String },
    #[error("{param}: a leading `*` has no default value to take")]
    LeadingWildcardWithoutDefault { param: String },
    #[error("{key}: sub-column {index} is out of range for a parameter with {count} sub-columns")]
    SubColumnOutOfRange {
        key: String,
        index: usize,
        count: usize,
    },
    #[error("{key}: parameter has {count} sub-columns and must be set per sub-column")]
    NotScalar { key: String, count: usize },
    #[error("{key}: year {year} precedes the first simulation year {first_year}")]
    YearBeforeStart {
        key: String,
        year: Year,
        first_year: Year,
    },
    #[error("{key}: year {year} is past the last supported year {last_year}")]
    YearBeyondHorizon {
        key: String,
        year: Year,
        last_year: Year,
    },
    #[error("{key}: unsupported value `{value}`")]
    InvalidValue { key: String, value: String },
    #[error("invalid reform JSON: {0}")]
    Json(#[from] serde_json::Error),
}
