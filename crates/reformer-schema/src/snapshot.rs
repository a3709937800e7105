use std::collections::{BTreeMap, BTreeSet};

use reformer_common::{ParamScalar, Year};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::param::{BOOLEAN_PARAMS, Bound, normalize_labels, parse_bound};
use crate::validation::{SchemaIssue, ValidationError};

/// Schema-provider dump of every configurable parameter for one first year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[schemars(
    title = "Reformer parameter schema snapshot",
    description = "Parameter metadata and per-year defaults used to expand a partial reform into a complete parameter set."
)]
#[serde(deny_unknown_fields)]
pub struct SchemaSnapshot {
    /// Calendar year of the first row of every `value` list.
    pub first_year: Year,
    /// Price-inflation rate by year, used for CPI indexing.
    #[serde(default)]
    pub price_inflation_rates: BTreeMap<Year, f64>,
    /// Wage-growth rate by year, used by wage-indexed parameters.
    #[serde(default)]
    pub wage_growth_rates: BTreeMap<Year, f64>,
    pub parameters: BTreeMap<String, ParameterDescriptor>,
}

/// Metadata and defaults for one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ParameterDescriptor {
    pub long_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub irs_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_2: Option<String>,
    #[serde(default)]
    pub kind: ParamKind,
    /// Either one value per year, or one row of sub-column values per year.
    #[schemars(with = "serde_json::Value")]
    pub value: DefaultValues,
    #[serde(default)]
    pub col_label: ColumnLabels,
    #[serde(default)]
    pub cpi_inflatable: bool,
    #[serde(default)]
    pub cpi_inflated: bool,
    #[serde(default)]
    pub indexing: IndexingBasis,
    #[serde(default)]
    pub boolean: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub coming_soon: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validations: Option<Validations>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compatible_data: Option<CompatibleData>,
}

/// Which engine parameter group a parameter belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    #[default]
    Policy,
    Behavior,
    Growdiff,
    Consumption,
    Elasticity,
}

impl ParamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamKind::Policy => "policy",
            ParamKind::Behavior => "behavior",
            ParamKind::Growdiff => "growdiff",
            ParamKind::Consumption => "consumption",
            ParamKind::Elasticity => "elasticity",
        }
    }
}

/// Rate table a CPI-inflatable parameter is indexed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum IndexingBasis {
    #[default]
    Price,
    Wage,
}

/// Default values as delivered by the schema provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValues {
    Rows(Vec<Vec<ParamScalar>>),
    Flat(Vec<ParamScalar>),
}

impl DefaultValues {
    /// Year-major rows; a flat list becomes one single-entry row per year.
    pub fn rows(&self) -> Vec<Vec<ParamScalar>> {
        match self {
            DefaultValues::Rows(rows) => rows.clone(),
            DefaultValues::Flat(values) => values.iter().map(|v| vec![*v]).collect(),
        }
    }

    /// Number of years covered.
    pub fn len(&self) -> usize {
        match self {
            DefaultValues::Rows(rows) => rows.len(),
            DefaultValues::Flat(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Column labels as a single string or one label per sub-column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ColumnLabels {
    Text(String),
    List(Vec<String>),
}

impl Default for ColumnLabels {
    fn default() -> Self {
        ColumnLabels::Text(String::new())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Validations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<BoundSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<BoundSpec>,
}

/// A bound as written in the schema: a number, a numeral string such as
/// `"9,000"`, or `"_Other_param"` naming another parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum BoundSpec {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CompatibleData {
    pub puf: bool,
    pub cps: bool,
}

impl Default for CompatibleData {
    fn default() -> Self {
        Self {
            puf: true,
            cps: true,
        }
    }
}

impl SchemaSnapshot {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_json_reader<R: std::io::Read>(reader: R) -> Result<Self, serde_json::Error> {
        serde_json::from_reader(reader)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    pub fn from_yaml_reader<R: std::io::Read>(reader: R) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_reader(reader)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Number of default years, taken from the longest parameter.
    pub fn num_years(&self) -> usize {
        self.parameters
            .values()
            .map(|p| p.value.len())
            .max()
            .unwrap_or(0)
    }

    /// Validate the snapshot and return granular issues when invariants fail.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.parameters.is_empty() {
            issues.push(SchemaIssue::new("parameters", "snapshot defines no parameters"));
        }

        let bare_ids: BTreeSet<&str> = self
            .parameters
            .keys()
            .map(|id| id.strip_prefix('_').unwrap_or(id))
            .collect();

        for (id, param) in &self.parameters {
            let path = format!("parameters.{id}");
            let rows = param.value.rows();

            if rows.is_empty() {
                issues.push(SchemaIssue::new(
                    format!("{path}.value"),
                    "must contain at least one year of defaults",
                ));
                continue;
            }

            let width = rows[0].len();
            if width == 0 {
                issues.push(SchemaIssue::new(
                    format!("{path}.value[0]"),
                    "row has no sub-column values",
                ));
            }
            for (i, row) in rows.iter().enumerate().skip(1) {
                if row.len() != width {
                    issues.push(SchemaIssue::new(
                        format!("{path}.value[{i}]"),
                        format!("row has {} entries, expected {width}", row.len()),
                    ));
                }
            }

            let labels = normalize_labels(&param.col_label);
            if labels.len() > 1 && labels.len() != width {
                issues.push(SchemaIssue::new(
                    format!("{path}.col_label"),
                    format!(
                        "{} labels for {width} sub-columns",
                        labels.len()
                    ),
                ));
            }

            let bare = id.strip_prefix('_').unwrap_or(id);
            if param.boolean || BOOLEAN_PARAMS.contains(&bare) {
                for (i, row) in rows.iter().enumerate() {
                    if row
                        .iter()
                        .any(|v| !v.is_boolean() && v.as_f64() != 0.0 && v.as_f64() != 1.0)
                    {
                        issues.push(SchemaIssue::new(
                            format!("{path}.value[{i}]"),
                            "boolean parameter defaults must be 0, 1, true, or false",
                        ));
                    }
                }
            }

            if let Some(validations) = &param.validations {
                for (side, spec) in [("min", &validations.min), ("max", &validations.max)] {
                    let Some(spec) = spec else { continue };
                    match parse_bound(spec) {
                        Some(Bound::Field(target)) => {
                            if !bare_ids.contains(target.as_str()) {
                                issues.push(SchemaIssue::new(
                                    format!("{path}.validations.{side}"),
                                    format!("bound references unknown parameter `{target}`"),
                                ));
                            }
                        }
                        Some(Bound::Value(_)) => {}
                        None => issues.push(SchemaIssue::new(
                            format!("{path}.validations.{side}"),
                            "bound is neither a number nor a parameter reference",
                        )),
                    }
                }
            }

            if param.cpi_inflatable && rows.len() > 1 {
                let (table, table_name) = match param.indexing {
                    IndexingBasis::Price => (&self.price_inflation_rates, "price_inflation_rates"),
                    IndexingBasis::Wage => (&self.wage_growth_rates, "wage_growth_rates"),
                };
                // Year y feeds the value for y + 1, so the last year needs no rate.
                for offset in 0..rows.len() - 1 {
                    let year = self.first_year + offset as Year;
                    if !table.contains_key(&year) {
                        issues.push(SchemaIssue::new(
                            table_name,
                            format!("missing rate for {year} required by `{id}`"),
                        ));
                    }
                }
            }
        }

        issues.sort_by(|a, b| a.path.cmp(&b.path));
        issues.dedup();

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(issues))
        }
    }
}

impl std::str::FromStr for SchemaSnapshot {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SchemaSnapshot::from_json_str(s)
    }
}

pub(crate) mod example_data {
    use super::*;

    pub fn exemption_example() -> SchemaSnapshot {
        let mut parameters = BTreeMap::new();
        parameters.insert(
            "_II_em".to_string(),
            ParameterDescriptor {
                long_name: "Personal and dependent exemption amount".to_string(),
                description: "Subtracted from AGI in the calculation of taxable income.".to_string(),
                irs_ref: None,
                notes: None,
                section_1: Some("Personal Exemptions".to_string()),
                section_2: Some("Personal And Dependent Exemption Amount".to_string()),
                kind: ParamKind::Policy,
                value: DefaultValues::Flat(vec![
                    ParamScalar::Number(4050.0),
                    ParamScalar::Number(4150.0),
                ]),
                col_label: ColumnLabels::default(),
                cpi_inflatable: true,
                cpi_inflated: true,
                indexing: IndexingBasis::Price,
                boolean: false,
                hidden: false,
                coming_soon: false,
                validations: Some(Validations {
                    min: Some(BoundSpec::Number(0.0)),
                    max: None,
                }),
                compatible_data: None,
            },
        );
        SchemaSnapshot {
            first_year: 2017,
            price_inflation_rates: BTreeMap::from([(2017, 0.0185), (2018, 0.0212)]),
            wage_growth_rates: BTreeMap::new(),
            parameters,
        }
    }
}
