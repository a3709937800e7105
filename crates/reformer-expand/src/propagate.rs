//! Fill a partial user series out to a complete year-indexed series.
//!
//! Each position resolves to the user's value, the schema default (for a
//! wildcard), or a value derived from the previous year. Derived values
//! are copied unchanged when the parameter is not CPI-indexed; otherwise
//! they are inflated by the previous year's rate and, for level series,
//! truncated to an integer.

use reformer_common::{ParamScalar, RawFieldValue};

use crate::error::ReformError;

/// One user-supplied position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeriesEntry {
    Value(ParamScalar),
    /// Take the schema default for this year.
    Wildcard,
    /// No value for this year; derive it from the previous year.
    Gap,
}

impl SeriesEntry {
    pub fn as_value(&self) -> Option<ParamScalar> {
        match self {
            SeriesEntry::Value(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<RawFieldValue> for SeriesEntry {
    fn from(raw: RawFieldValue) -> Self {
        match raw {
            RawFieldValue::Wildcard => SeriesEntry::Wildcard,
            RawFieldValue::Boolean(b) => SeriesEntry::Value(ParamScalar::Boolean(b)),
            RawFieldValue::Number(n) => SeriesEntry::Value(ParamScalar::Number(n)),
            RawFieldValue::ReverseMarker => SeriesEntry::Gap,
        }
    }
}

impl From<ParamScalar> for SeriesEntry {
    fn from(value: ParamScalar) -> Self {
        SeriesEntry::Value(value)
    }
}

/// Whether derived values keep their fractional part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeriesKind {
    /// At least one concrete user value is below 1.0.
    Rate,
    /// Dollar amounts and other whole-number levels.
    Level,
}

impl SeriesKind {
    pub fn classify(entries: &[SeriesEntry]) -> Self {
        let is_rate = entries
            .iter()
            .filter_map(SeriesEntry::as_value)
            .any(|v| v.as_f64() < 1.0);
        if is_rate {
            SeriesKind::Rate
        } else {
            SeriesKind::Level
        }
    }
}

/// Propagation settings for one series.
#[derive(Debug, Clone, Copy)]
pub struct Propagator<'a> {
    /// Name used in errors.
    pub param: &'a str,
    pub cpi: bool,
    /// `rates[i]` inflates position `i` into position `i + 1`.
    pub rates: &'a [f64],
    /// Minimum output length, for aligning sub-columns of one matrix.
    pub min_len: usize,
}

impl<'a> Propagator<'a> {
    pub fn new(param: &'a str, cpi: bool, rates: &'a [f64]) -> Self {
        Self {
            param,
            cpi,
            rates,
            min_len: 0,
        }
    }

    pub fn with_min_len(mut self, min_len: usize) -> Self {
        self.min_len = min_len;
        self
    }

    /// Output length for a series of `user_len` entries against
    /// `default_len` defaults.
    pub fn output_len(&self, user_len: usize, default_len: usize) -> usize {
        user_len.max(default_len).max(self.min_len)
    }

    pub fn run(
        &self,
        entries: &[SeriesEntry],
        defaults: &[ParamScalar],
    ) -> Result<Vec<ParamScalar>, ReformError> {
        match entries.first() {
            None | Some(SeriesEntry::Gap) => {
                return Err(ReformError::BlankLeadingValue {
                    param: self.param.to_string(),
                });
            }
            Some(SeriesEntry::Wildcard) if defaults.is_empty() => {
                return Err(ReformError::LeadingWildcardWithoutDefault {
                    param: self.param.to_string(),
                });
            }
            _ => {}
        }

        let kind = SeriesKind::classify(entries);
        let len = self.output_len(entries.len(), defaults.len());
        let mut out: Vec<ParamScalar> = Vec::with_capacity(len);

        for i in 0..len {
            let resolved = match entries.get(i) {
                Some(SeriesEntry::Value(v)) => Some(*v),
                Some(SeriesEntry::Wildcard) => defaults.get(i).copied(),
                Some(SeriesEntry::Gap) | None => None,
            };
            let value = match resolved {
                Some(v) => v,
                // Position 0 always resolves, so `i >= 1` here.
                None => self.derive(out[i - 1], i - 1, kind),
            };
            out.push(value);
        }
        Ok(out)
    }

    fn derive(&self, prev: ParamScalar, prev_idx: usize, kind: SeriesKind) -> ParamScalar {
        if !self.cpi || prev.is_boolean() {
            return prev;
        }
        let rate = self.rates.get(prev_idx).copied().unwrap_or(0.0);
        let inflated = prev.as_f64() * (1.0 + rate);
        match kind {
            SeriesKind::Rate => ParamScalar::Number(inflated),
            SeriesKind::Level => ParamScalar::Number(inflated).truncated(),
        }
    }
}

/// Propagate one series in a single call.
pub fn propagate(
    param: &str,
    entries: &[SeriesEntry],
    defaults: &[ParamScalar],
    cpi: bool,
    rates: &[f64],
) -> Result<Vec<ParamScalar>, ReformError> {
    Propagator::new(param, cpi, rates).run(entries, defaults)
}
