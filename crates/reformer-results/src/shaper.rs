//! Turn flat result series into labeled tables.

use std::collections::BTreeMap;

use reformer_common::Year;
use serde::{Deserialize, Serialize};

use crate::bundle::{CellInput, ResultBundle, TableSeries};
use crate::error::ResultsError;
use crate::taxonomy::{ColumnFormat, TableId, Taxonomy};

/// Aliases the results page reads the aggregate tables under.
pub const AGGREGATE_ALIASES: [(&str, TableId); 3] = [
    ("fiscal_change", TableId::AggrD),
    ("fiscal_currentlaw", TableId::Aggr1),
    ("fiscal_reform", TableId::Aggr2),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellFormat {
    pub divisor: u64,
    pub decimals: u8,
}

impl From<&ColumnFormat> for CellFormat {
    fn from(format: &ColumnFormat) -> Self {
        Self {
            divisor: format.divisor,
            decimals: format.decimals,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultCell {
    /// Multi-year tables: one value per simulated year.
    Years {
        year_values: BTreeMap<Year, f64>,
        format: CellFormat,
        first_value: f64,
    },
    /// Aggregate tables: the column already is the year.
    Value { value: f64, format: CellFormat },
}

impl ResultCell {
    pub fn format(&self) -> CellFormat {
        match self {
            ResultCell::Years { format, .. } | ResultCell::Value { format, .. } => *format,
        }
    }

    pub fn value_for(&self, year: Year) -> Option<f64> {
        match self {
            ResultCell::Years { year_values, .. } => year_values.get(&year).copied(),
            ResultCell::Value { value, .. } => Some(*value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultColumn {
    pub label: String,
    #[serde(flatten)]
    pub format: ColumnFormat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub label: String,
    pub cells: Vec<ResultCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultTable {
    pub id: TableId,
    pub label: String,
    pub col_labels: Vec<String>,
    pub cols: Vec<ResultColumn>,
    pub rows: Vec<ResultRow>,
    pub multi_valued: bool,
}

/// Every table of one bundle, plus the simulated years.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ShapedResults {
    #[serde(flatten)]
    pub tables: BTreeMap<String, ResultTable>,
    pub result_years: Vec<Year>,
}

impl ShapedResults {
    pub fn get(&self, name: &str) -> Option<&ResultTable> {
        self.tables.get(name)
    }
}

/// Builds tables for results whose first simulated year is `first_year`.
#[derive(Debug, Clone, Copy)]
pub struct ResultsShaper<'a> {
    taxonomy: &'a Taxonomy,
    first_year: Year,
}

impl<'a> ResultsShaper<'a> {
    pub fn new(taxonomy: &'a Taxonomy, first_year: Year) -> Self {
        Self {
            taxonomy,
            first_year,
        }
    }

    pub fn years(&self, num_years: usize) -> Vec<Year> {
        (0..num_years)
            .map(|i| self.first_year + i as Year)
            .collect()
    }

    /// Shape the table named `id`. The name is checked against the known
    /// tables before any series is read.
    pub fn shape_table(
        &self,
        id: &str,
        series: &TableSeries,
        num_years: usize,
    ) -> Result<ResultTable, ResultsError> {
        let id: TableId = id.parse()?;
        self.shape(id, series, num_years)
    }

    pub fn shape(
        &self,
        id: TableId,
        series: &TableSeries,
        num_years: usize,
    ) -> Result<ResultTable, ResultsError> {
        let years = self.years(num_years);
        let cols: Vec<ResultColumn> = match self.taxonomy.columns(id) {
            Some(specs) => specs
                .iter()
                .map(|c| ResultColumn {
                    label: c.label.clone(),
                    format: c.format.clone(),
                })
                .collect(),
            None => years
                .iter()
                .map(|y| ResultColumn {
                    label: y.to_string(),
                    format: self.taxonomy.aggregate_format.clone(),
                })
                .collect(),
        };

        let mut rows = Vec::with_capacity(self.taxonomy.rows(id).len());
        for row in self.taxonomy.rows(id) {
            let mut cells = Vec::with_capacity(cols.len());
            for (col, column) in cols.iter().enumerate() {
                let format = CellFormat::from(&column.format);
                let cell = if id.is_multi_year() {
                    let mut year_values = BTreeMap::new();
                    for (offset, year) in years.iter().enumerate() {
                        let key = format!("{}_{offset}", row.key);
                        year_values.insert(*year, cell_value(id, series, &key, col)?);
                    }
                    let first_value = year_values.get(&self.first_year).copied().ok_or_else(|| {
                        ResultsError::MissingSeries {
                            table: id.to_string(),
                            key: format!("{}_0", row.key),
                        }
                    })?;
                    ResultCell::Years {
                        year_values,
                        format,
                        first_value,
                    }
                } else {
                    ResultCell::Value {
                        value: cell_value(id, series, &row.key, col)?,
                        format,
                    }
                };
                cells.push(cell);
            }
            rows.push(ResultRow {
                label: row.label.clone(),
                cells,
            });
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(table = %id, rows = rows.len(), years = num_years, "shaped result table");

        Ok(ResultTable {
            id,
            label: self.taxonomy.table_label(id).to_string(),
            col_labels: cols.iter().map(|c| c.label.clone()).collect(),
            cols,
            rows,
            multi_valued: id.is_multi_year(),
        })
    }

    /// Shape every table in `bundle` and add the aggregate aliases.
    pub fn shape_all(&self, bundle: &ResultBundle) -> Result<ShapedResults, ResultsError> {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("shape_results", tables = bundle.tables.len()).entered();

        let num_years = bundle.num_years();
        let mut shaped = ShapedResults {
            tables: BTreeMap::new(),
            result_years: self.years(num_years),
        };
        for (name, series) in &bundle.tables {
            let table = self.shape_table(name, series, num_years)?;
            shaped.tables.insert(name.clone(), table);
        }
        for (alias, id) in AGGREGATE_ALIASES {
            if let Some(table) = shaped.tables.get(id.as_str()).cloned() {
                shaped.tables.insert(alias.to_string(), table);
            }
        }
        Ok(shaped)
    }
}

fn cell_value(id: TableId, series: &TableSeries, key: &str, col: usize) -> Result<f64, ResultsError> {
    let values = series.get(key).ok_or_else(|| ResultsError::MissingSeries {
        table: id.to_string(),
        key: key.to_string(),
    })?;
    let cell: &CellInput = values.get(col).ok_or_else(|| ResultsError::MissingColumn {
        table: id.to_string(),
        key: key.to_string(),
        column: col,
    })?;
    cell.numeric().ok_or_else(|| ResultsError::NotNumeric {
        table: id.to_string(),
        key: key.to_string(),
        value: cell.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(key: &str, values: &[&str]) -> (String, Vec<CellInput>) {
        (key.to_string(), values.iter().map(|v| CellInput::from(*v)).collect())
    }

    #[test]
    fn aggregate_table_has_a_column_per_year() {
        let taxonomy = Taxonomy::default();
        let shaper = ResultsShaper::new(&taxonomy, 2018);
        let data = TableSeries::from([
            row("ind_tax", &["1", "2"]),
            row("payroll_tax", &["3", "4"]),
            row("combined_tax", &["4", "6"]),
        ]);
        let table = shaper.shape_table("aggr_d", &data, 2).unwrap();
        assert_eq!(table.col_labels, vec!["2018", "2019"]);
        assert!(!table.multi_valued);
        assert_eq!(table.rows[2].label, taxonomy.aggregate_rows[2].label);
        assert_eq!(table.rows[1].cells[1].value_for(2019), Some(4.0));
        assert_eq!(table.rows[0].cells[0].format().divisor, 1_000_000_000);
    }

    #[test]
    fn unknown_table_is_rejected_before_reading_series() {
        let taxonomy = Taxonomy::default();
        let shaper = ResultsShaper::new(&taxonomy, 2018);
        let err = shaper
            .shape_table("mY_dec", &TableSeries::new(), 1)
            .unwrap_err();
        assert!(matches!(err, ResultsError::UnknownTable { .. }), "{err:?}");
    }

    #[test]
    fn short_row_reports_missing_column() {
        let taxonomy = Taxonomy::default();
        let shaper = ResultsShaper::new(&taxonomy, 2018);
        let data = TableSeries::from([
            row("ind_tax", &["1"]),
            row("payroll_tax", &["3", "4"]),
            row("combined_tax", &["4", "6"]),
        ]);
        match shaper.shape_table("aggr_1", &data, 2).unwrap_err() {
            ResultsError::MissingColumn { key, column, .. } => {
                assert_eq!(key, "ind_tax");
                assert_eq!(column, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
