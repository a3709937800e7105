//! Row, column, and table labels for result tables.
//!
//! [`Taxonomy::default`] carries the Tax-Calculator labels and formats; a
//! different engine version can ship its own taxonomy as JSON.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ResultsError;

/// The closed set of result tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TableId {
    #[serde(rename = "dist1_xdec")]
    Dist1Xdec,
    #[serde(rename = "dist2_xdec")]
    Dist2Xdec,
    #[serde(rename = "dist1_xbin")]
    Dist1Xbin,
    #[serde(rename = "dist2_xbin")]
    Dist2Xbin,
    #[serde(rename = "diff_itax_xdec")]
    DiffItaxXdec,
    #[serde(rename = "diff_ptax_xdec")]
    DiffPtaxXdec,
    #[serde(rename = "diff_comb_xdec")]
    DiffCombXdec,
    #[serde(rename = "diff_itax_xbin")]
    DiffItaxXbin,
    #[serde(rename = "diff_ptax_xbin")]
    DiffPtaxXbin,
    #[serde(rename = "diff_comb_xbin")]
    DiffCombXbin,
    #[serde(rename = "aggr_1")]
    Aggr1,
    #[serde(rename = "aggr_2")]
    Aggr2,
    #[serde(rename = "aggr_d")]
    AggrD,
}

/// Table shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    /// Weighted totals of tax variables, one cell per year.
    Distribution,
    /// Baseline-versus-reform change, one cell per year.
    Difference,
    /// One column per year.
    Aggregate,
}

/// Which row taxonomy a table uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowGroup {
    Decile,
    Bin,
    Aggregate,
}

impl TableId {
    pub const ALL: [TableId; 13] = [
        TableId::Dist2Xdec,
        TableId::Dist1Xdec,
        TableId::DiffItaxXdec,
        TableId::DiffPtaxXdec,
        TableId::DiffCombXdec,
        TableId::Dist2Xbin,
        TableId::Dist1Xbin,
        TableId::DiffItaxXbin,
        TableId::DiffPtaxXbin,
        TableId::DiffCombXbin,
        TableId::AggrD,
        TableId::Aggr1,
        TableId::Aggr2,
    ];

    /// Difference tables, whose columns were reordered in engine 0.13.
    pub const DIFFERENCE: [TableId; 6] = [
        TableId::DiffItaxXdec,
        TableId::DiffPtaxXdec,
        TableId::DiffCombXdec,
        TableId::DiffItaxXbin,
        TableId::DiffPtaxXbin,
        TableId::DiffCombXbin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TableId::Dist1Xdec => "dist1_xdec",
            TableId::Dist2Xdec => "dist2_xdec",
            TableId::Dist1Xbin => "dist1_xbin",
            TableId::Dist2Xbin => "dist2_xbin",
            TableId::DiffItaxXdec => "diff_itax_xdec",
            TableId::DiffPtaxXdec => "diff_ptax_xdec",
            TableId::DiffCombXdec => "diff_comb_xdec",
            TableId::DiffItaxXbin => "diff_itax_xbin",
            TableId::DiffPtaxXbin => "diff_ptax_xbin",
            TableId::DiffCombXbin => "diff_comb_xbin",
            TableId::Aggr1 => "aggr_1",
            TableId::Aggr2 => "aggr_2",
            TableId::AggrD => "aggr_d",
        }
    }

    pub fn kind(&self) -> TableKind {
        match self {
            TableId::Dist1Xdec | TableId::Dist2Xdec | TableId::Dist1Xbin | TableId::Dist2Xbin => {
                TableKind::Distribution
            }
            TableId::Aggr1 | TableId::Aggr2 | TableId::AggrD => TableKind::Aggregate,
            _ => TableKind::Difference,
        }
    }

    pub fn row_group(&self) -> RowGroup {
        match self {
            TableId::Dist1Xdec
            | TableId::Dist2Xdec
            | TableId::DiffItaxXdec
            | TableId::DiffPtaxXdec
            | TableId::DiffCombXdec => RowGroup::Decile,
            TableId::Aggr1 | TableId::Aggr2 | TableId::AggrD => RowGroup::Aggregate,
            _ => RowGroup::Bin,
        }
    }

    /// Cells hold one value per year rather than one column per year.
    pub fn is_multi_year(&self) -> bool {
        self.kind() != TableKind::Aggregate
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableId {
    type Err = ResultsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TableId::ALL
            .iter()
            .copied()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| ResultsError::UnknownTable {
                id: s.to_string(),
                expected: TableId::ALL
                    .iter()
                    .map(TableId::as_str)
                    .collect::<Vec<_>>()
                    .join(","),
            })
    }
}

/// Display format of a column: values are divided by `divisor` and shown
/// with `decimals` places.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnFormat {
    pub divisor: u64,
    pub units: Option<String>,
    pub decimals: u8,
}

impl ColumnFormat {
    pub fn new(divisor: u64, units: Option<&str>, decimals: u8) -> Self {
        Self {
            divisor,
            units: units.map(str::to_string),
            decimals,
        }
    }

    /// Billions of dollars, one decimal.
    pub fn billions() -> Self {
        Self::new(1_000_000_000, Some("Dollars"), 1)
    }

    /// Thousands of units, no decimals.
    pub fn thousands() -> Self {
        Self::new(1000, None, 0)
    }

    pub fn percent() -> Self {
        Self::new(1, Some("%"), 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowSpec {
    /// Key prefix in the result series.
    pub key: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub label: String,
    #[serde(flatten)]
    pub format: ColumnFormat,
}

/// Labels and formats for every table kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    pub decile_rows: Vec<RowSpec>,
    pub bin_rows: Vec<RowSpec>,
    pub aggregate_rows: Vec<RowSpec>,
    pub distribution_columns: Vec<ColumnSpec>,
    pub difference_columns: Vec<ColumnSpec>,
    /// Format of every year column of an aggregate table.
    pub aggregate_format: ColumnFormat,
    pub table_labels: BTreeMap<TableId, String>,
}

impl Taxonomy {
    pub fn from_json_str(json: &str) -> Result<Self, ResultsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn rows(&self, id: TableId) -> &[RowSpec] {
        match id.row_group() {
            RowGroup::Decile => &self.decile_rows,
            RowGroup::Bin => &self.bin_rows,
            RowGroup::Aggregate => &self.aggregate_rows,
        }
    }

    /// Fixed columns of a table; aggregate tables have one column per year
    /// instead.
    pub fn columns(&self, id: TableId) -> Option<&[ColumnSpec]> {
        match id.kind() {
            TableKind::Distribution => Some(&self.distribution_columns),
            TableKind::Difference => Some(&self.difference_columns),
            TableKind::Aggregate => None,
        }
    }

    pub fn table_label(&self, id: TableId) -> &str {
        self.table_labels
            .get(&id)
            .map_or_else(|| id.as_str(), String::as_str)
    }
}

fn rows(pairs: &[(&str, &str)]) -> Vec<RowSpec> {
    pairs
        .iter()
        .map(|(key, label)| RowSpec {
            key: key.to_string(),
            label: label.to_string(),
        })
        .collect()
}

fn columns(specs: &[(&str, ColumnFormat)]) -> Vec<ColumnSpec> {
    specs
        .iter()
        .map(|(label, format)| ColumnSpec {
            label: label.to_string(),
            format: format.clone(),
        })
        .collect()
}

impl Default for Taxonomy {
    fn default() -> Self {
        let count = ColumnFormat::thousands;
        let dollars = ColumnFormat::billions;

        let decile_rows = rows(&[
            ("0-10", "0-10%"),
            ("10-20", "10-20%"),
            ("20-30", "20-30%"),
            ("30-40", "30-40%"),
            ("40-50", "40-50%"),
            ("50-60", "50-60%"),
            ("60-70", "60-70%"),
            ("70-80", "70-80%"),
            ("80-90", "80-90%"),
            ("90-100", "90-100%"),
            ("all", "All"),
        ]);
        let bin_rows = rows(&[
            ("<$10K", "Less than 10"),
            ("$10-20K", "10-20"),
            ("$20-30K", "20-30"),
            ("$30-40K", "30-40"),
            ("$40-50K", "40-50"),
            ("$50-75K", "50-75"),
            ("$75-100K", "75-100"),
            ("$100-200K", "100-200"),
            ("$200-500K", "200-500"),
            ("$500-1000K", "500-1000"),
            (">$1000K", "1000+"),
            ("all", "All"),
        ]);
        let aggregate_rows = rows(&[
            ("ind_tax", "Individual Income Tax Liability Change"),
            ("payroll_tax", "Payroll Tax Liability Change"),
            (
                "combined_tax",
                "Combined Payroll and Individual Income Tax Liability Change",
            ),
        ]);

        let distribution_columns = columns(&[
            ("Returns", count()),
            ("AGI", dollars()),
            ("Standard Deduction Filers", count()),
            ("Standard Deduction", dollars()),
            ("Itemizers", count()),
            ("Itemized Deduction", dollars()),
            ("Personal Exemption", dollars()),
            ("Taxable Income", dollars()),
            ("Regular Tax", dollars()),
            ("AMTI", dollars()),
            ("AMT Filers", count()),
            ("AMT", dollars()),
            ("Tax before Credits", dollars()),
            ("Non-refundable Credits", dollars()),
            ("Tax before Refundable Credits", dollars()),
            ("Refundable Credits", dollars()),
            ("Individual Income Tax Liabilities", dollars()),
            ("Payroll Tax Liablities", dollars()),
            (
                "Combined Payroll and Individual Income Tax Liabilities",
                dollars(),
            ),
        ]);
        let difference_columns = columns(&[
            ("All Tax Units", count()),
            ("Tax Units with Tax Cut", count()),
            ("Percent with Tax Cut", ColumnFormat::percent()),
            ("Tax Units with Tax Increase", count()),
            ("Percent with Tax Increase", ColumnFormat::percent()),
            ("Average Tax Change", ColumnFormat::new(1, Some("Dollars"), 0)),
            ("Total Tax Difference", dollars()),
            ("Share of Overall Change", ColumnFormat::percent()),
        ]);

        let by_bin = "by expanded income bin";
        let by_decile = "by expanded income decile";
        let difference = "Difference between Base and User plans";
        let table_labels = BTreeMap::from([
            (
                TableId::DiffCombXbin,
                format!("Combined Payroll and Individual Income Tax: {difference} {by_bin}"),
            ),
            (
                TableId::DiffCombXdec,
                format!("Combined Payroll and Individual Income Tax: {difference} {by_decile}"),
            ),
            (
                TableId::DiffItaxXbin,
                format!("Individual Income Tax: {difference} {by_bin}"),
            ),
            (
                TableId::DiffItaxXdec,
                format!("Individual Income Tax: {difference} {by_decile}"),
            ),
            (TableId::DiffPtaxXbin, format!("Payroll Tax: {difference} {by_bin}")),
            (TableId::DiffPtaxXdec, format!("Payroll Tax: {difference} {by_decile}")),
            (
                TableId::Dist1Xbin,
                format!("Base plan tax vars, weighted total {by_bin}"),
            ),
            (
                TableId::Dist1Xdec,
                format!("Base plan tax vars, weighted total {by_decile}"),
            ),
            (
                TableId::Dist2Xbin,
                format!("User plan tax vars, weighted total {by_bin}"),
            ),
            (
                TableId::Dist2Xdec,
                format!("User plan tax vars, weighted total {by_decile}"),
            ),
            (
                TableId::Aggr1,
                "Total Liabilities Baseline by Calendar Year".to_string(),
            ),
            (
                TableId::AggrD,
                "Total Liabilities Change by Calendar Year".to_string(),
            ),
            (
                TableId::Aggr2,
                "Total Liabilities Reform by Calendar Year".to_string(),
            ),
        ]);

        Self {
            decile_rows,
            bin_rows,
            aggregate_rows,
            distribution_columns,
            difference_columns,
            aggregate_format: ColumnFormat::billions(),
            table_labels,
        }
    }
}
