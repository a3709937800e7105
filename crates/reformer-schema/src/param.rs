//! Per-parameter metadata built from a snapshot descriptor.
//!
//! A [`ParameterColumn`] owns one [`ParameterField`] per sub-column. Each
//! field carries the year-indexed defaults for that sub-column, aligned by
//! offset from the column's `start_year`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use reformer_common::{ParamScalar, Year};
use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::snapshot::{
    BoundSpec, ColumnLabels, CompatibleData, IndexingBasis, ParamKind, ParameterDescriptor,
};

/// Parameters stored as 0/1 by the engine but edited as booleans.
pub const BOOLEAN_PARAMS: &[&str] = &["DependentCredit_before_CTC"];

/// Parameters kept in the model but never offered for editing.
pub const HIDDEN_PARAMS: &[&str] = &[
    "_ACTC_Income_thd",
    "_AMT_Child_em",
    "_AMT_em_pe",
    "_AMT_thd_MarriedS",
    "_CDCC_ps",
    "_CDCC_crt",
    "_DCC_c",
    "_EITC_InvestIncome_c",
    "_EITC_ps_MarriedJ",
    "_ETC_pe_Single",
    "_ETC_pe_Married",
    "_KT_c_Age",
    "_LLC_Expense_c",
    "_FEI_ec_c",
];

pub const MARS_LABELS: [&str; 4] = [
    "Single",
    "Married filing Jointly",
    "Married filing Separately",
    "Head of Household",
];

pub const KIDS_LABELS: [&str; 4] = ["0 Kids", "1 Kid", "2 Kids", "3+ Kids"];

/// Label of the boolean sub-field that toggles inflation indexing.
pub const CPI_LABEL: &str = "CPI";

const FILING_STATUS_MARKERS: [&str; 3] = ["widow", "separate", "dependent"];

/// Normalize raw column labels to one display label per sub-column.
pub fn normalize_labels(labels: &ColumnLabels) -> Vec<String> {
    match labels {
        ColumnLabels::List(list) => {
            if list.iter().map(String::as_str).eq(["0kids", "1kid", "2kids", "3+kids"]) {
                KIDS_LABELS.iter().map(|s| s.to_string()).collect()
            } else if list
                .iter()
                .any(|l| FILING_STATUS_MARKERS.contains(&l.as_str()))
            {
                MARS_LABELS.iter().map(|s| s.to_string()).collect()
            } else if list.is_empty() {
                vec![String::new()]
            } else {
                list.clone()
            }
        }
        ColumnLabels::Text(text) => {
            let words: Vec<&str> = text.split_whitespace().collect();
            if text.is_empty() || text == "NA" {
                vec![String::new()]
            } else if words == ["0kids", "1kid", "2kids", "3+kids"] {
                KIDS_LABELS.iter().map(|s| s.to_string()).collect()
            } else {
                vec![text.clone()]
            }
        }
    }
}

/// A resolved min or max bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bound {
    Value(f64),
    /// Bare id of another parameter whose series bounds this one.
    Field(String),
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Value(v) => write!(f, "{v}"),
            Bound::Field(id) => write!(f, "{id}"),
        }
    }
}

/// Coerce a schema bound: numbers stay numbers, numeral strings (commas
/// allowed) become numbers, `_Name` becomes a reference to `Name`.
pub fn parse_bound(spec: &BoundSpec) -> Option<Bound> {
    match spec {
        BoundSpec::Number(n) => Some(Bound::Value(*n)),
        BoundSpec::Text(text) => {
            let trimmed = text.trim();
            if let Ok(n) = trimmed.replace(',', "").parse::<f64>() {
                Some(Bound::Value(n))
            } else {
                trimmed
                    .strip_prefix('_')
                    .filter(|rest| !rest.is_empty())
                    .map(|rest| Bound::Field(rest.to_string()))
            }
        }
    }
}

/// Microdata source a simulation will run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    #[default]
    Puf,
    Cps,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DataSource::Puf => "puf",
            DataSource::Cps => "cps",
        })
    }
}

impl FromStr for DataSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "puf" => Ok(DataSource::Puf),
            "cps" => Ok(DataSource::Cps),
            other => Err(format!("unknown data source `{other}` (expected puf or cps)")),
        }
    }
}

/// How sub-field ids are derived from the parameter id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamingConvention {
    /// One sub-column, addressed by the bare id (`II_em`).
    Bare,
    /// Several sub-columns, addressed as `II_brk2_0` .. `II_brk2_3`.
    Indexed,
}

impl NamingConvention {
    pub fn for_count(sub_columns: usize) -> Self {
        if sub_columns <= 1 {
            NamingConvention::Bare
        } else {
            NamingConvention::Indexed
        }
    }

    pub fn field_id(&self, bare_id: &str, index: usize) -> String {
        match self {
            NamingConvention::Bare => bare_id.to_string(),
            NamingConvention::Indexed => format!("{bare_id}_{index}"),
        }
    }
}

/// One scalar sub-column of a parameter across all default years.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterField {
    pub id: String,
    pub label: String,
    pub values: Vec<ParamScalar>,
    pub start_year: Year,
}

impl ParameterField {
    pub fn values_by_year(&self) -> BTreeMap<Year, ParamScalar> {
        self.values
            .iter()
            .enumerate()
            .map(|(i, v)| (self.start_year + i as Year, *v))
            .collect()
    }

    /// Default for the first simulation year.
    pub fn default_value(&self) -> Option<ParamScalar> {
        self.values.first().copied()
    }

    pub fn value_for(&self, year: Year) -> Option<ParamScalar> {
        let offset = usize::try_from(year - self.start_year).ok()?;
        self.values.get(offset).copied()
    }
}

/// The boolean `<id>_cpi` sub-field of an inflatable parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpiField {
    pub id: String,
    pub label: String,
    pub default: bool,
}

/// Knobs for turning a snapshot into a [`crate::ParameterSet`].
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// First simulation year; defaults to the snapshot's first year.
    pub first_year: Option<Year>,
    pub data_source: DataSource,
    pub hidden: Vec<String>,
    pub boolean_params: Vec<String>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            first_year: None,
            data_source: DataSource::default(),
            hidden: HIDDEN_PARAMS.iter().map(|s| s.to_string()).collect(),
            boolean_params: BOOLEAN_PARAMS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// One schema parameter with its sub-columns and presentation metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterColumn {
    /// Id as the engine spells it, usually with a leading underscore.
    pub canonical_id: String,
    /// Id without the leading underscore.
    pub bare_id: String,
    pub display_name: String,
    pub description: String,
    pub start_year: Year,
    pub kind: ParamKind,
    pub indexing: IndexingBasis,
    pub boolean: bool,
    pub is_inflatable: bool,
    pub cpi_field: Option<CpiField>,
    pub min_bound: Option<Bound>,
    pub max_bound: Option<Bound>,
    pub hidden: bool,
    pub coming_soon: bool,
    /// Not compatible with the data source the set was loaded for.
    pub gray_out: bool,
    pub applicable_to: CompatibleData,
    pub section_1: Option<String>,
    pub section_2: Option<String>,
    pub fields: Vec<ParameterField>,
}

impl ParameterColumn {
    /// Build a column whose defaults start `offset` rows into the
    /// descriptor's value list.
    pub fn from_descriptor(
        id: &str,
        descriptor: &ParameterDescriptor,
        start_year: Year,
        offset: usize,
        options: &LoadOptions,
    ) -> Result<Self, SchemaError> {
        let bare_id = id.strip_prefix('_').unwrap_or(id).to_string();
        let mut rows = descriptor.value.rows();
        if rows.is_empty() {
            return Err(SchemaError::EmptyDefaults {
                param: id.to_string(),
            });
        }
        let width = rows[0].len();
        for (row, values) in rows.iter().enumerate() {
            if values.len() != width || width == 0 {
                return Err(SchemaError::RaggedDefaults {
                    param: id.to_string(),
                    row,
                    expected: width,
                    found: values.len(),
                });
            }
        }
        if offset > 0 {
            // Keep at least the final year when the requested start lies past the data.
            let skip = offset.min(rows.len() - 1);
            rows.drain(..skip);
        }

        let boolean = descriptor.boolean || options.boolean_params.iter().any(|b| *b == bare_id);
        let columns: Vec<Vec<ParamScalar>> = (0..width)
            .map(|col| {
                rows.iter()
                    .map(|row| {
                        let v = row[col];
                        if boolean {
                            ParamScalar::Boolean(v.is_truthy())
                        } else {
                            v.rounded_if_at_least_one()
                        }
                    })
                    .collect()
            })
            .collect();

        let mut labels = normalize_labels(&descriptor.col_label);
        if labels.len() != width {
            if labels.len() > width {
                labels.truncate(width);
            } else {
                labels.resize(width, String::new());
            }
        }

        let naming = NamingConvention::for_count(width);
        let fields = columns
            .into_iter()
            .zip(labels)
            .enumerate()
            .map(|(i, (values, label))| ParameterField {
                id: naming.field_id(&bare_id, i),
                label,
                values,
                start_year,
            })
            .collect();

        let cpi_field = descriptor.cpi_inflatable.then(|| CpiField {
            id: format!("{bare_id}_cpi"),
            label: CPI_LABEL.to_string(),
            default: descriptor.cpi_inflated,
        });

        let applicable_to = descriptor.compatible_data.unwrap_or_default();
        let gray_out = descriptor.compatible_data.is_some_and(|c| match options.data_source {
            DataSource::Puf => !c.puf,
            DataSource::Cps => !c.cps,
        });

        let description = [
            descriptor.description.as_str(),
            descriptor.irs_ref.as_deref().unwrap_or(""),
            descriptor.notes.as_deref().unwrap_or(""),
        ]
        .join(" ")
        .trim()
        .to_string();

        let validations = descriptor.validations.clone().unwrap_or_default();

        Ok(Self {
            canonical_id: id.to_string(),
            bare_id,
            display_name: descriptor.long_name.clone(),
            description,
            start_year,
            kind: descriptor.kind,
            indexing: descriptor.indexing,
            boolean,
            is_inflatable: descriptor.cpi_inflatable,
            cpi_field,
            min_bound: validations.min.as_ref().and_then(parse_bound),
            max_bound: validations.max.as_ref().and_then(parse_bound),
            hidden: descriptor.hidden || options.hidden.iter().any(|h| h == id),
            coming_soon: descriptor.coming_soon,
            gray_out,
            applicable_to,
            section_1: descriptor.section_1.clone(),
            section_2: descriptor.section_2.clone(),
            fields,
        })
    }

    pub fn sub_column_count(&self) -> usize {
        self.fields.len()
    }

    pub fn naming(&self) -> NamingConvention {
        NamingConvention::for_count(self.fields.len())
    }

    /// Number of default years.
    pub fn num_years(&self) -> usize {
        self.fields.first().map_or(0, |f| f.values.len())
    }

    /// Schema default of the inflation flag (`false` when not inflatable).
    pub fn inflation_flag_default(&self) -> bool {
        self.cpi_field.as_ref().is_some_and(|c| c.default)
    }

    pub fn is_editable(&self) -> bool {
        !self.hidden && !self.coming_soon
    }

    pub fn is_visible(&self) -> bool {
        !self.hidden
    }

    pub fn field(&self, index: usize) -> Option<&ParameterField> {
        self.fields.get(index)
    }

    pub fn field_by_id(&self, id: &str) -> Option<&ParameterField> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// Default series of one sub-column.
    pub fn defaults(&self, index: usize) -> &[ParamScalar] {
        self.fields.get(index).map_or(&[][..], |f| f.values.as_slice())
    }

    /// Year-major default rows, `rows[year][sub_column]`.
    pub fn default_rows(&self) -> Vec<Vec<ParamScalar>> {
        (0..self.num_years())
            .map(|y| self.fields.iter().map(|f| f.values[y]).collect())
            .collect()
    }
}
