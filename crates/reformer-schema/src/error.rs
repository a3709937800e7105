use reformer_common::Year;
use thiserror::Error;

use crate::validation::ValidationError;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to read schema snapshot: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid schema snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid schema snapshot YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("parameter `{param}` has no default values")]
    EmptyDefaults { param: String },
    #[error("parameter `{param}` row {row} has {found} entries, expected {expected}")]
    RaggedDefaults {
        param: String,
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("requested first year {requested} precedes snapshot first year {snapshot}")]
    YearBeforeSnapshot { requested: Year, snapshot: Year },
}
