use std::{
    fmt::{self, Display},
    hash::{Hash, Hasher},
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/* ───────────────────── Parameter values ─────────────────────────────
A resolved parameter value as handed to the simulation engine.

  Int     – dollar amounts, counts, and anything integer-coerced
  Number  – rates and other fractional values
  Boolean – switches (schema booleans and `_cpi` flags)

Serialized untagged so JSON reads `5000`, `0.35`, `true`.
------------------------------------------------------------------- */

/// A single resolved parameter value.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamScalar {
    Int(i64),
    Number(f64),
    Boolean(bool),
}

impl Hash for ParamScalar {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            ParamScalar::Int(i) => i.hash(state),
            ParamScalar::Number(n) => n.to_bits().hash(state),
            ParamScalar::Boolean(b) => b.hash(state),
        }
    }
}

impl Eq for ParamScalar {}

impl Display for ParamScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamScalar::Int(i) => write!(f, "{i}"),
            ParamScalar::Number(n) => write!(f, "{n}"),
            ParamScalar::Boolean(b) => write!(f, "{b}"),
        }
    }
}

impl From<f64> for ParamScalar {
    fn from(value: f64) -> Self {
        ParamScalar::Number(value)
    }
}

impl From<i64> for ParamScalar {
    fn from(value: i64) -> Self {
        ParamScalar::Int(value)
    }
}

impl From<bool> for ParamScalar {
    fn from(value: bool) -> Self {
        ParamScalar::Boolean(value)
    }
}

impl ParamScalar {
    /// Numeric view of the value; booleans map to 1.0 / 0.0.
    pub fn as_f64(&self) -> f64 {
        match self {
            ParamScalar::Int(i) => *i as f64,
            ParamScalar::Number(n) => *n,
            ParamScalar::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            ParamScalar::Int(i) => *i != 0,
            ParamScalar::Number(n) => *n != 0.0,
            ParamScalar::Boolean(b) => *b,
        }
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, ParamScalar::Boolean(_))
    }

    /// Truncate toward zero into an `Int`. Booleans are left alone.
    pub fn truncated(self) -> Self {
        match self {
            ParamScalar::Number(n) => ParamScalar::Int(n.trunc() as i64),
            other => other,
        }
    }

    /// Values of at least 1.0 become the nearest integer; fractional rates
    /// (and booleans) are returned unchanged.
    pub fn rounded_if_at_least_one(self) -> Self {
        match self {
            ParamScalar::Number(n) if n >= 1.0 => ParamScalar::Int(n.round() as i64),
            other => other,
        }
    }
}

/* ───────────────────── Raw field tokens ───────────────────────────── */

/// One user-entered token from a comma-separated field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawFieldValue {
    /// `*`: take the schema default for this position.
    Wildcard,
    /// `<`: derive the field from a related field. Only legal as the
    /// leading token and never carries a value of its own.
    ReverseMarker,
    Boolean(bool),
    Number(f64),
}

impl RawFieldValue {
    pub fn is_wildcard(&self) -> bool {
        matches!(self, RawFieldValue::Wildcard)
    }

    pub fn is_reverse(&self) -> bool {
        matches!(self, RawFieldValue::ReverseMarker)
    }

    /// Concrete value carried by the token, if any.
    pub fn as_scalar(&self) -> Option<ParamScalar> {
        match self {
            RawFieldValue::Boolean(b) => Some(ParamScalar::Boolean(*b)),
            RawFieldValue::Number(n) => Some(ParamScalar::Number(*n)),
            RawFieldValue::Wildcard | RawFieldValue::ReverseMarker => None,
        }
    }
}

impl Display for RawFieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawFieldValue::Wildcard => write!(f, "*"),
            RawFieldValue::ReverseMarker => write!(f, "<"),
            RawFieldValue::Boolean(b) => write!(f, "{b}"),
            RawFieldValue::Number(n) => write!(f, "{n}"),
        }
    }
}
