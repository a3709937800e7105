use crate::tokenizer::{Token, TokenKind, Tokenizer};
use crate::types::{ParseContext, ParsedField};
use reformer_common::{FieldErrorKind, FieldParseError, RawFieldValue};

/// Parse the raw text of `field` into typed values.
///
/// A leading `<` sets [`ParsedField::reversed`] and is dropped from the
/// values; `<` anywhere else is rejected.
pub fn parse_field(
    field: &str,
    text: &str,
    ctx: ParseContext,
) -> Result<ParsedField, FieldParseError> {
    let tokenizer = Tokenizer::new(text).map_err(|e| {
        FieldParseError::new(FieldErrorKind::Unrecognized, field, e.token, e.pos)
    })?;

    let mut parsed = ParsedField::default();
    for (n, token) in tokenizer.items.iter().enumerate() {
        if token.is_reverse() {
            if n == 0 && token.index == 0 {
                parsed.reversed = true;
                continue;
            }
            return Err(FieldParseError::new(
                FieldErrorKind::MisplacedReverse,
                field,
                token.value.clone(),
                token.start,
            ));
        }
        parsed.values.push(convert(field, token, ctx)?);
    }
    Ok(parsed)
}

fn convert(field: &str, token: &Token, ctx: ParseContext) -> Result<RawFieldValue, FieldParseError> {
    match token.kind {
        TokenKind::Wildcard => Ok(RawFieldValue::Wildcard),
        TokenKind::Reverse => Ok(RawFieldValue::ReverseMarker),
        TokenKind::Logical => Ok(RawFieldValue::Boolean(
            token.value.eq_ignore_ascii_case("true"),
        )),
        TokenKind::Number => {
            let n: f64 = token.value.parse().map_err(|_| {
                FieldParseError::new(
                    FieldErrorKind::Unrecognized,
                    field,
                    token.value.clone(),
                    token.start,
                )
            })?;
            match ctx {
                ParseContext::Numeric => Ok(RawFieldValue::Number(n)),
                ParseContext::Boolean if n == 1.0 => Ok(RawFieldValue::Boolean(true)),
                ParseContext::Boolean if n == 0.0 => Ok(RawFieldValue::Boolean(false)),
                ParseContext::Boolean => Err(FieldParseError::new(
                    FieldErrorKind::NotBoolean,
                    field,
                    token.value.clone(),
                    token.start,
                )),
            }
        }
    }
}

/// Cheap grammar check: `true` when every non-empty piece is a wildcard,
/// boolean, number, or a leading `<`.
pub fn is_safe(text: &str) -> bool {
    text.split(',')
        .map(str::trim)
        .enumerate()
        .filter(|(_, p)| !p.is_empty())
        .all(|(i, piece)| match Token::classify(piece) {
            Some(TokenKind::Reverse) => i == 0,
            Some(_) => true,
            None => false,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_reverse_is_stripped() {
        let p = parse_field("II_em", "<,5000", ParseContext::Numeric).unwrap();
        assert!(p.reversed);
        assert_eq!(p.values, vec![RawFieldValue::Number(5000.0)]);
    }

    #[test]
    fn reverse_after_an_empty_piece_is_misplaced() {
        let err = parse_field("II_em", ",<", ParseContext::Numeric).unwrap_err();
        assert_eq!(err.kind, FieldErrorKind::MisplacedReverse);
    }

    #[test]
    fn boolean_context_coerces_unit_numbers() {
        let p = parse_field("X_cpi", "1, 0.0 ,False", ParseContext::Boolean).unwrap();
        assert_eq!(
            p.values,
            vec![
                RawFieldValue::Boolean(true),
                RawFieldValue::Boolean(false),
                RawFieldValue::Boolean(false)
            ]
        );
        let err = parse_field("X_cpi", "2", ParseContext::Boolean).unwrap_err();
        assert_eq!(err.kind, FieldErrorKind::NotBoolean);
        assert_eq!(err.token, "2");
    }

    #[test]
    fn safe_check_mirrors_grammar() {
        assert!(is_safe("<,*,1.5"));
        assert!(is_safe(""));
        assert!(!is_safe("1,<"));
        assert!(!is_safe(",<"));
        assert!(!is_safe("1e3"));
        assert!(!is_safe("abc"));
    }
}
