use std::collections::BTreeMap;
use std::fmt;

use reformer_common::{ParamScalar, Year};
use reformer_schema::ParamKind;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::input::OverrideSet;

/// Resolved values of one parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExpandedValues {
    /// One value per year.
    Series(Vec<ParamScalar>),
    /// One row of sub-column values per year.
    Matrix(Vec<Vec<ParamScalar>>),
}

impl ExpandedValues {
    /// Number of years.
    pub fn len(&self) -> usize {
        match self {
            ExpandedValues::Series(v) => v.len(),
            ExpandedValues::Matrix(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values of sub-column `index` by year. A series has only column 0.
    pub fn column(&self, index: usize) -> Vec<ParamScalar> {
        match self {
            ExpandedValues::Series(v) if index == 0 => v.clone(),
            ExpandedValues::Series(_) => Vec::new(),
            ExpandedValues::Matrix(rows) => {
                rows.iter().filter_map(|r| r.get(index).copied()).collect()
            }
        }
    }
}

/// A complete, gap-free parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedParameter {
    pub parameter_id: String,
    pub kind: ParamKind,
    pub values: ExpandedValues,
    pub cpi_flag: bool,
}

impl ExpandedParameter {
    /// The series keyed as input: the id for a series, `<id>_<i>` per
    /// sub-column of a matrix.
    fn split_columns(&self) -> Vec<(String, Vec<ParamScalar>)> {
        match &self.values {
            ExpandedValues::Series(values) => vec![(self.parameter_id.clone(), values.clone())],
            ExpandedValues::Matrix(rows) => {
                let width = rows.first().map_or(0, Vec::len);
                (0..width)
                    .map(|i| (format!("{}_{i}", self.parameter_id), self.values.column(i)))
                    .collect()
            }
        }
    }
}

/// Something the assembler noticed but did not treat as fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// The key matched no parameter and was dropped.
    DroppedKey { key: String },
    /// The parameter does not apply to the selected data source.
    IncompatibleData { key: String, data_source: String },
    /// A resolved value lies outside the schema bounds.
    OutOfBounds { key: String, message: String },
}

impl Diagnostic {
    pub fn key(&self) -> &str {
        match self {
            Diagnostic::DroppedKey { key }
            | Diagnostic::IncompatibleData { key, .. }
            | Diagnostic::OutOfBounds { key, .. } => key,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::DroppedKey { key } => write!(f, "{key}: not a known parameter, dropped"),
            Diagnostic::IncompatibleData { key, data_source } => {
                write!(f, "{key}: not used with the {data_source} data source")
            }
            Diagnostic::OutOfBounds { message, .. } => f.write_str(message),
        }
    }
}

/// The complete reform handed to the simulation engine.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AssembledReform {
    pub first_year: Year,
    pub policy: BTreeMap<String, ExpandedParameter>,
    /// Explicit inflation flags, keyed by canonical parameter id.
    pub cpi_flags: BTreeMap<String, bool>,
    /// Non-policy parameters by engine group (`behavior`,
    /// `growdiff_baseline`, `growdiff_response`, ...), then by id.
    pub assumptions: BTreeMap<String, BTreeMap<String, ExpandedParameter>>,
    pub diagnostics: Vec<Diagnostic>,
}

impl AssembledReform {
    /// A policy parameter, else the first assumption group holding `id`.
    pub fn get(&self, id: &str) -> Option<&ExpandedParameter> {
        self.policy
            .get(id)
            .or_else(|| self.assumptions.values().find_map(|group| group.get(id)))
    }

    pub fn assumption(&self, group: &str, id: &str) -> Option<&ExpandedParameter> {
        self.assumptions.get(group)?.get(id)
    }

    pub fn is_empty(&self) -> bool {
        self.policy.is_empty()
            && self.cpi_flags.is_empty()
            && self.assumptions.values().all(BTreeMap::is_empty)
    }

    /// Overrides that reproduce this reform when assembled again.
    pub fn to_overrides(&self) -> OverrideSet {
        let mut overrides = OverrideSet::new();
        for param in self.policy.values() {
            for (key, values) in param.split_columns() {
                overrides.insert_values(key, values);
            }
        }
        for (group, params) in &self.assumptions {
            for param in params.values() {
                for (key, values) in param.split_columns() {
                    overrides.insert_grouped_values(group.clone(), key, values);
                }
            }
        }
        for (id, flag) in &self.cpi_flags {
            overrides.insert_values(format!("{id}_cpi"), [*flag]);
        }
        overrides
    }

    /// The engine payload as a JSON value.
    pub fn to_engine_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

/// An entry of the engine's `policy` group.
#[derive(Serialize)]
#[serde(untagged)]
enum PolicyEntry<'a> {
    Values(&'a ExpandedValues),
    Flag(bool),
}

/// Serializes as `{"policy": {...}, "behavior": {...}, ...}`; CPI flags
/// appear in `policy` as `<id>_cpi`.
impl Serialize for AssembledReform {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut policy: BTreeMap<String, PolicyEntry<'_>> = BTreeMap::new();
        for (id, param) in &self.policy {
            policy.insert(id.clone(), PolicyEntry::Values(&param.values));
        }
        for (id, flag) in &self.cpi_flags {
            policy.insert(format!("{id}_cpi"), PolicyEntry::Flag(*flag));
        }

        let groups: Vec<(&str, BTreeMap<&str, &ExpandedValues>)> = self
            .assumptions
            .iter()
            .map(|(group, params)| {
                let values = params
                    .iter()
                    .map(|(id, param)| (id.as_str(), &param.values))
                    .collect();
                (group.as_str(), values)
            })
            .collect();

        let mut map = serializer.serialize_map(Some(1 + groups.len()))?;
        map.serialize_entry("policy", &policy)?;
        for (group, params) in &groups {
            map.serialize_entry(group, params)?;
        }
        map.end()
    }
}
