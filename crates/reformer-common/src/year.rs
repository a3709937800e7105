//! Calendar-year helpers for year-indexed parameter and result series.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A calendar year.
pub type Year = i32;

/// Contiguous run of simulation years starting at `first`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct YearSpan {
    pub first: Year,
    pub len: usize,
}

impl YearSpan {
    pub fn new(first: Year, len: usize) -> Self {
        Self { first, len }
    }

    /// Year at `offset` from the first year.
    pub fn year_at(&self, offset: usize) -> Year {
        self.first + offset as Year
    }

    /// Offset of `year`, or `None` when it falls outside the span.
    pub fn offset_of(&self, year: Year) -> Option<usize> {
        if year < self.first {
            return None;
        }
        let offset = (year - self.first) as usize;
        (offset < self.len).then_some(offset)
    }

    pub fn last(&self) -> Option<Year> {
        self.len.checked_sub(1).map(|o| self.year_at(o))
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Year> + '_ {
        (0..self.len).map(move |o| self.year_at(o))
    }
}

impl fmt::Display for YearSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.last() {
            Some(last) => write!(f, "{}-{}", self.first, last),
            None => write!(f, "{} (empty)", self.first),
        }
    }
}
