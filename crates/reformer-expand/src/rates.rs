use std::collections::BTreeMap;

use reformer_common::Year;
use reformer_schema::{IndexingBasis, ParameterSet, RateTables};

/// Year-by-year growth rates used to inflate propagated values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexingRates {
    tables: RateTables,
}

impl IndexingRates {
    pub fn new(tables: RateTables) -> Self {
        Self { tables }
    }

    pub fn from_set(set: &ParameterSet) -> Self {
        Self::new(set.rates().clone())
    }

    /// Rate for `year`. Years past the table repeat the last known rate,
    /// years before it take the first; an empty table yields 0.0.
    pub fn rate(&self, basis: IndexingBasis, year: Year) -> f64 {
        let table: &BTreeMap<Year, f64> = self.tables.table(basis);
        table
            .range(..=year)
            .next_back()
            .or_else(|| table.iter().next())
            .map_or(0.0, |(_, rate)| *rate)
    }

    /// `n` rates starting at `first_year`; entry `i` inflates year
    /// `first_year + i` into the following year.
    pub fn for_update(&self, basis: IndexingBasis, first_year: Year, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| self.rate(basis, first_year + i as Year))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_rate_repeats_past_table() {
        let rates = IndexingRates::new(RateTables {
            price: BTreeMap::from([(2017, 0.02), (2018, 0.03)]),
            wage: BTreeMap::new(),
        });
        assert_eq!(
            rates.for_update(IndexingBasis::Price, 2017, 4),
            vec![0.02, 0.03, 0.03, 0.03]
        );
        assert_eq!(rates.rate(IndexingBasis::Price, 2010), 0.02);
        assert_eq!(rates.for_update(IndexingBasis::Wage, 2017, 2), vec![0.0, 0.0]);
    }
}
