//! Parameter metadata model for reform expansion.
//!
//! A [`SchemaSnapshot`] is the serialized form delivered by the schema
//! provider; a [`ParameterSet`] is the immutable, per-first-year model the
//! assembler consults.

pub mod bounds;
pub mod error;
pub mod param;
pub mod set;
pub mod snapshot;
pub mod validation;

use once_cell::sync::Lazy;
use serde_json::Value as JsonValue;

pub use bounds::{BoundSide, BoundViolation};
pub use error::SchemaError;
pub use param::{
    BOOLEAN_PARAMS, Bound, CpiField, DataSource, HIDDEN_PARAMS, LoadOptions, NamingConvention,
    ParameterColumn, ParameterField, normalize_labels, parse_bound,
};
pub use set::{ParameterSet, RateTables, Section, SubSection, read_snapshot};
pub use snapshot::{
    BoundSpec, ColumnLabels, CompatibleData, DefaultValues, IndexingBasis, ParamKind,
    ParameterDescriptor, SchemaSnapshot, Validations,
};
pub use validation::{SchemaIssue, ValidationError};

static SCHEMA_JSON: Lazy<String> = Lazy::new(generate_schema_json_pretty);

/// JSON Schema describing [`SchemaSnapshot`].
pub fn schema_json() -> &'static str {
    SCHEMA_JSON.as_str()
}

/// Generate the JSON Schema as a `serde_json::Value`.
pub fn generate_schema_value() -> JsonValue {
    let schema = schemars::schema_for!(SchemaSnapshot);
    serde_json::to_value(&schema).unwrap_or(JsonValue::Null)
}

/// Generate the JSON Schema as a pretty-printed string.
pub fn generate_schema_json_pretty() -> String {
    serde_json::to_string_pretty(&generate_schema_value()).unwrap_or_default()
}
