use std::convert::TryFrom;
use std::error::Error;
use std::fmt::{self, Display};

const SEPARATOR: u8 = b',';

/// A custom error type for the tokenizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizerError {
    pub message: String,
    /// The offending token text.
    pub token: String,
    pub pos: usize,
}

impl fmt::Display for TokenizerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenizerError: {}", self.message)
    }
}

impl Error for TokenizerError {}

/// The kind of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Wildcard,
    Reverse,
    Logical,
    Number,
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// A token in a reform field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    pub value: String,
    pub kind: TokenKind,
    /// Position of the token in the comma-separated list, counting empty
    /// pieces that were skipped.
    pub index: usize,
    pub start: usize,
    pub end: usize,
}

impl Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} value: {}>", self.kind, self.value)
    }
}

impl Token {
    fn from_slice(source: &str, kind: TokenKind, index: usize, start: usize, end: usize) -> Self {
        Token {
            value: source[start..end].to_string(),
            kind,
            index,
            start,
            end,
        }
    }

    /// Classify a trimmed piece of field text, or `None` when it matches
    /// no part of the grammar.
    pub fn classify(piece: &str) -> Option<TokenKind> {
        if piece == "*" {
            Some(TokenKind::Wildcard)
        } else if piece == "<" {
            Some(TokenKind::Reverse)
        } else if piece.eq_ignore_ascii_case("true") || piece.eq_ignore_ascii_case("false") {
            Some(TokenKind::Logical)
        } else if is_number_literal(piece) {
            Some(TokenKind::Number)
        } else {
            None
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.kind == TokenKind::Wildcard
    }

    pub fn is_reverse(&self) -> bool {
        self.kind == TokenKind::Reverse
    }
}

/// Digits with at most one decimal point and an optional leading minus.
/// Exponents, thousands separators, `inf` and `nan` are not part of the
/// field grammar even though `f64::from_str` would accept some of them.
fn is_number_literal(piece: &str) -> bool {
    let body = piece.strip_prefix('-').unwrap_or(piece);
    if body.is_empty() {
        return false;
    }
    let mut digits = 0usize;
    let mut points = 0usize;
    for b in body.bytes() {
        match b {
            b'0'..=b'9' => digits += 1,
            b'.' => points += 1,
            _ => return false,
        }
    }
    digits > 0 && points <= 1
}

/// Splits one field's text into classified tokens.
///
/// Empty pieces (`"1,,2"`, a trailing comma) are skipped; surrounding
/// whitespace is trimmed from every piece.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    text: String,
    pub items: Vec<Token>,
    offset: usize,
    index: usize,
}

impl Tokenizer {
    pub fn new(text: &str) -> Result<Self, TokenizerError> {
        let mut tokenizer = Tokenizer {
            text: text.to_string(),
            items: Vec::with_capacity(text.len() / 2 + 1),
            offset: 0,
            index: 0,
        };
        tokenizer.parse()?;
        Ok(tokenizer)
    }

    fn parse(&mut self) -> Result<(), TokenizerError> {
        let len = self.text.len();
        while self.offset <= len {
            let piece_end = self.text.as_bytes()[self.offset..]
                .iter()
                .position(|b| *b == SEPARATOR)
                .map(|p| self.offset + p)
                .unwrap_or(len);
            self.save_piece(self.offset, piece_end)?;
            self.index += 1;
            self.offset = piece_end + 1;
        }
        Ok(())
    }

    fn save_piece(&mut self, start: usize, end: usize) -> Result<(), TokenizerError> {
        let raw = &self.text[start..end];
        let leading = raw.len() - raw.trim_start().len();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(());
        }
        let start = start + leading;
        let end = start + trimmed.len();
        match Token::classify(trimmed) {
            Some(kind) => {
                self.items
                    .push(Token::from_slice(&self.text, kind, self.index, start, end));
                Ok(())
            }
            None => Err(TokenizerError {
                message: format!("Unrecognized value: {trimmed}"),
                token: trimmed.to_string(),
                pos: start,
            }),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Reconstruct the field from the tokens, normalized to `a,b,c`.
    pub fn render(&self) -> String {
        self.items
            .iter()
            .map(|t| t.value.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl TryFrom<&str> for Tokenizer {
    type Error = TokenizerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Tokenizer::new(value)
    }
}

impl TryFrom<String> for Tokenizer {
    type Error = TokenizerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Tokenizer::new(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<TokenKind> {
        Tokenizer::new(text)
            .unwrap()
            .items
            .iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn classifies_each_piece() {
        assert_eq!(
            kinds("<,*, 1.5 ,TRUE,-3"),
            vec![
                TokenKind::Reverse,
                TokenKind::Wildcard,
                TokenKind::Number,
                TokenKind::Logical,
                TokenKind::Number
            ]
        );
    }

    #[test]
    fn spans_point_at_trimmed_text() {
        let t = Tokenizer::new(" 10 , 20").unwrap();
        assert_eq!((t.items[0].start, t.items[0].end), (1, 3));
        assert_eq!((t.items[1].start, t.items[1].end), (6, 8));
        assert_eq!(t.render(), "10,20");
    }

    #[test]
    fn empty_pieces_are_skipped_but_counted() {
        let t = Tokenizer::new("1,,2,").unwrap();
        assert_eq!(t.items.len(), 2);
        assert_eq!(t.items[1].index, 2);
        assert!(Tokenizer::new("").unwrap().is_empty());
    }

    #[test]
    fn rejects_non_grammar_numbers() {
        for bad in ["1e5", "1,000.0.0", "inf", "NaN", "--1", "1.2.3", "-", "**", "yes"] {
            assert!(Tokenizer::new(bad).is_err(), "{bad} should be rejected");
        }
        let err = Tokenizer::new("5,abc").unwrap_err();
        assert_eq!(err.token, "abc");
        assert_eq!(err.pos, 2);
    }
}
