use reformer_common::RawFieldValue;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which coercion rules apply to numeric tokens.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParseContext {
    #[default]
    Numeric,
    /// `1`/`0`/`1.0`/`0.0` are read as booleans; any other number is an
    /// error.
    Boolean,
}

/// The typed contents of one field.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedField {
    /// The field began with `<`.
    pub reversed: bool,
    pub values: Vec<RawFieldValue>,
}

impl ParsedField {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn has_wildcard(&self) -> bool {
        self.values.iter().any(RawFieldValue::is_wildcard)
    }
}
