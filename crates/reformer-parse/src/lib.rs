//! Field-level parsing for reform input.
//!
//! A field is comma-separated text such as `"<,*,5000,true"`. The
//! [`Tokenizer`] classifies each piece and [`parse_field`] turns the tokens
//! into [`RawFieldValue`]s, attributing any failure to the field name.

pub mod parser;
pub mod tokenizer;
pub mod types;

pub use parser::{is_safe, parse_field};
pub use tokenizer::{Token, TokenKind, Tokenizer, TokenizerError};
pub use types::{ParseContext, ParsedField};

pub use reformer_common::{FieldErrorKind, FieldParseError, RawFieldValue};
