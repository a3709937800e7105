//! Field-level input errors.
//!
//! - **`FieldErrorKind`** : what went wrong with a token
//! - **`FieldParseError`**: the kind plus the field name and offending text
//!
//! Every error names the field it came from so a caller can point the user
//! at the exact input that needs correcting.

use std::{error::Error, fmt};

/// Reasons a single field can fail to parse.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FieldErrorKind {
    /// Token is not a wildcard, reverse marker, boolean, or number.
    Unrecognized,
    /// `<` appeared somewhere other than the first position.
    MisplacedReverse,
    /// A boolean was expected but the token is some other number.
    NotBoolean,
}

impl fmt::Display for FieldErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unrecognized => "unrecognized value",
            Self::MisplacedReverse => "misplaced reverse operator",
            Self::NotBoolean => "expected a boolean",
        })
    }
}

/// Error raised while turning one user field into typed values.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldParseError {
    pub kind: FieldErrorKind,
    /// Name of the field the text was submitted under.
    pub field: String,
    /// The offending token (or whole text when no single token is at fault).
    pub token: String,
    /// Byte offset of the token within the field text.
    pub position: usize,
}

impl FieldParseError {
    pub fn new(
        kind: FieldErrorKind,
        field: impl Into<String>,
        token: impl Into<String>,
        position: usize,
    ) -> Self {
        Self {
            kind,
            field: field.into(),
            token: token.into(),
            position,
        }
    }

    /// User-facing message in the form the input form displays.
    pub fn message(&self) -> String {
        match self.kind {
            FieldErrorKind::Unrecognized => format!("Unrecognized value: {}", self.token),
            FieldErrorKind::MisplacedReverse => {
                "Operator '<' can only be used at the beginning".to_string()
            }
            FieldErrorKind::NotBoolean => format!(
                "Expected case insensitive 'true' or 'false' but got {}",
                self.token
            ),
        }
    }
}

impl fmt::Display for FieldParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message())
    }
}

impl Error for FieldParseError {}
