//! Input adapters that turn form submissions and reform files into an
//! [`OverrideSet`].

use std::collections::BTreeMap;

use reformer_common::{ParamScalar, Year};
use reformer_parse::{ParseContext, parse_field};
use reformer_schema::ParameterSet;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::config::AssemblerConfig;
use crate::error::ReformError;
use crate::propagate::SeriesEntry;

/// One override as the assembler consumes it.
#[derive(Debug, Clone, PartialEq)]
pub struct Override {
    /// Engine group the override was submitted under; `None` for policy
    /// fields and form input.
    pub group: Option<String>,
    pub key: String,
    pub entries: Vec<SeriesEntry>,
}

/// Typed user overrides keyed by the raw field name, with assumption
/// groups (`behavior`, `growdiff_baseline`, ...) kept apart.
///
/// Consumed by [`crate::ReformAssembler::assemble`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverrideSet {
    entries: BTreeMap<String, Vec<SeriesEntry>>,
    grouped: BTreeMap<String, BTreeMap<String, Vec<SeriesEntry>>>,
}

impl OverrideSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, entries: Vec<SeriesEntry>) {
        self.entries.insert(key.into(), entries);
    }

    /// Insert concrete values.
    pub fn insert_values<I, V>(&mut self, key: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<ParamScalar>,
    {
        self.insert(key, values_to_entries(values));
    }

    /// Insert into a named engine group.
    pub fn insert_grouped(
        &mut self,
        group: impl Into<String>,
        key: impl Into<String>,
        entries: Vec<SeriesEntry>,
    ) {
        self.grouped
            .entry(group.into())
            .or_default()
            .insert(key.into(), entries);
    }

    pub fn insert_grouped_values<I, V>(
        &mut self,
        group: impl Into<String>,
        key: impl Into<String>,
        values: I,
    ) where
        I: IntoIterator<Item = V>,
        V: Into<ParamScalar>,
    {
        self.insert_grouped(group, key, values_to_entries(values));
    }

    pub fn get(&self, key: &str) -> Option<&[SeriesEntry]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    pub fn get_grouped(&self, group: &str, key: &str) -> Option<&[SeriesEntry]> {
        self.grouped.get(group)?.get(key).map(Vec::as_slice)
    }

    /// Number of overrides across all groups.
    pub fn len(&self) -> usize {
        self.entries.len() + self.grouped.values().map(BTreeMap::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys of the ungrouped overrides.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.grouped.keys().map(String::as_str)
    }

    pub fn extend(&mut self, other: OverrideSet) {
        self.entries.extend(other.entries);
        for (group, params) in other.grouped {
            self.grouped.entry(group).or_default().extend(params);
        }
    }
}

fn values_to_entries<I, V>(values: I) -> Vec<SeriesEntry>
where
    I: IntoIterator<Item = V>,
    V: Into<ParamScalar>,
{
    values
        .into_iter()
        .map(|v| SeriesEntry::Value(v.into()))
        .collect()
}

impl IntoIterator for OverrideSet {
    type Item = Override;
    type IntoIter = std::vec::IntoIter<Override>;

    fn into_iter(self) -> Self::IntoIter {
        let ungrouped = self.entries.into_iter().map(|(key, entries)| Override {
            group: None,
            key,
            entries,
        });
        let grouped = self.grouped.into_iter().flat_map(|(group, params)| {
            params.into_iter().map(move |(key, entries)| Override {
                group: Some(group.clone()),
                key,
                entries,
            })
        });
        ungrouped.chain(grouped).collect::<Vec<_>>().into_iter()
    }
}

/// A flat `field -> text` form submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormInput {
    fields: BTreeMap<String, String>,
}

impl FormInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.fields.insert(key.into(), text.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, text: impl Into<String>) {
        self.fields.insert(key.into(), text.into());
    }

    /// Read a JSON object of fields. Numbers and booleans are taken as
    /// their text; `null` fields are skipped.
    pub fn from_json_str(json: &str) -> Result<Self, ReformError> {
        let raw: BTreeMap<String, JsonValue> = serde_json::from_str(json)?;
        let mut fields = BTreeMap::new();
        for (key, value) in raw {
            let text = match value {
                JsonValue::Null => continue,
                JsonValue::String(s) => s,
                JsonValue::Bool(b) => b.to_string(),
                JsonValue::Number(n) => n.to_string(),
                other => {
                    return Err(ReformError::InvalidValue {
                        key,
                        value: other.to_string(),
                    });
                }
            };
            fields.insert(key, text);
        }
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// Parse every field. Meta keys and empty fields are skipped; `_cpi`
    /// flags and boolean parameters parse in boolean context. Switch
    /// checkboxes count as on when present, and mirrored fields are copied
    /// onto their targets last.
    pub fn into_overrides(
        self,
        set: &ParameterSet,
        config: &AssemblerConfig,
    ) -> Result<OverrideSet, ReformError> {
        let mut overrides = OverrideSet::new();
        for (key, text) in self.fields {
            if config.is_ignored(&key) {
                continue;
            }
            if config.switch_index(&key).is_some() {
                let on = checkbox_value(&text);
                overrides.insert(key, vec![SeriesEntry::Value(ParamScalar::Boolean(on))]);
                continue;
            }
            let boolean = key.ends_with("_cpi") || set.get(&key).is_some_and(|p| p.boolean);
            let ctx = if boolean {
                ParseContext::Boolean
            } else {
                ParseContext::Numeric
            };
            let parsed = parse_field(&key, &text, ctx)?;
            if parsed.is_empty() {
                continue;
            }
            let entries = parsed.values.into_iter().map(SeriesEntry::from).collect();
            overrides.insert(key, entries);
        }

        let mirrored: Vec<(String, Vec<SeriesEntry>)> = overrides
            .entries
            .iter()
            .filter_map(|(key, entries)| config.mirror_of(key).map(|t| (t, entries.clone())))
            .collect();
        for (target, entries) in mirrored {
            overrides.insert(target, entries);
        }
        Ok(overrides)
    }
}

/// A submitted checkbox is on unless it explicitly says otherwise.
fn checkbox_value(text: &str) -> bool {
    !matches!(
        text.trim().to_ascii_lowercase().as_str(),
        "false" | "0" | "0.0" | "off"
    )
}

/// Year keys as written in the file (`"2018"`).
type YearMap = BTreeMap<String, JsonValue>;

/// A year-keyed reform document: `{"policy": {"_II_em": {"2018": [5000]}}}`.
///
/// Other top-level groups (`behavior`, `growdiff_response`, ...) are read
/// the same way and kept under their own name.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct JsonReformFile {
    #[serde(default)]
    pub policy: BTreeMap<String, YearMap>,
    #[serde(flatten)]
    pub groups: BTreeMap<String, BTreeMap<String, YearMap>>,
}

impl JsonReformFile {
    pub fn from_json_str(json: &str) -> Result<Self, ReformError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reform plus an optional assumptions document.
    pub fn from_strs(reform: &str, assumptions: Option<&str>) -> Result<Self, ReformError> {
        let mut file = Self::from_json_str(reform)?;
        if let Some(text) = assumptions {
            let extra = Self::from_json_str(text)?;
            file.policy.extend(extra.policy);
            for (group, params) in extra.groups {
                file.groups.entry(group).or_default().extend(params);
            }
        }
        Ok(file)
    }

    /// Convert to positional overrides relative to `first_year`. Years
    /// before the first specified year become wildcards; years between
    /// specified years become gaps. Matrix rows split into `<id>_<i>`
    /// sub-column overrides. Non-policy groups stay separate, and years
    /// at or past `first_year + horizon` are rejected.
    pub fn to_overrides(&self, first_year: Year, horizon: usize) -> Result<OverrideSet, ReformError> {
        let mut overrides = OverrideSet::new();
        for (key, years) in &self.policy {
            for (key, entries) in year_overrides(key, years, first_year, horizon)? {
                overrides.insert(key, entries);
            }
        }
        for (group, params) in &self.groups {
            for (key, years) in params {
                for (key, entries) in year_overrides(key, years, first_year, horizon)? {
                    overrides.insert_grouped(group.clone(), key, entries);
                }
            }
        }
        Ok(overrides)
    }
}

/// Positional series for one year-keyed parameter.
fn year_overrides(
    key: &str,
    years: &YearMap,
    first_year: Year,
    horizon: usize,
) -> Result<Vec<(String, Vec<SeriesEntry>)>, ReformError> {
    let mut by_year: BTreeMap<Year, &JsonValue> = BTreeMap::new();
    for (year, value) in years {
        let year: Year = year.trim().parse().map_err(|_| ReformError::InvalidValue {
            key: key.to_string(),
            value: format!("year {year}"),
        })?;
        by_year.insert(year, value);
    }

    let last_year = first_year.saturating_add(horizon as Year).saturating_sub(1);
    let mut columns: BTreeMap<Option<usize>, Vec<SeriesEntry>> = BTreeMap::new();
    let mut width: Option<usize> = None;
    for (year, value) in by_year {
        if year < first_year {
            return Err(ReformError::YearBeforeStart {
                key: key.to_string(),
                year,
                first_year,
            });
        }
        if year > last_year {
            return Err(ReformError::YearBeyondHorizon {
                key: key.to_string(),
                year,
                last_year,
            });
        }
        let pos = (year - first_year) as usize;
        let row = year_row(key, value)?;
        let row_width = row.len();
        match width {
            Some(w) if w != row_width => {
                return Err(ReformError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                });
            }
            _ => width = Some(row_width),
        }
        let multi = row_width > 1;
        for (i, scalar) in row.into_iter().enumerate() {
            let slot = if multi { Some(i) } else { None };
            let series = columns.entry(slot).or_default();
            // Leading years are wildcards, interior years are gaps.
            let fill = if series.is_empty() {
                SeriesEntry::Wildcard
            } else {
                SeriesEntry::Gap
            };
            series.resize(pos, fill);
            series.push(scalar);
        }
    }
    Ok(columns
        .into_iter()
        .map(|(slot, entries)| match slot {
            Some(i) => (format!("{key}_{i}"), entries),
            None => (key.to_string(), entries),
        })
        .collect())
}

/// One year's value: a scalar, a one-element list, or a row of sub-column
/// values (`[[a, b, c, d]]` or `[a, b, c, d]`).
fn year_row(key: &str, value: &JsonValue) -> Result<Vec<SeriesEntry>, ReformError> {
    let invalid = || ReformError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    };
    let items: Vec<&JsonValue> = match value {
        JsonValue::Array(outer) => match outer.as_slice() {
            [JsonValue::Array(inner)] => inner.iter().collect(),
            _ => outer.iter().collect(),
        },
        other => vec![other],
    };
    if items.is_empty() {
        return Err(invalid());
    }
    items
        .into_iter()
        .map(|item| json_entry(item).ok_or_else(invalid))
        .collect()
}

fn json_entry(value: &JsonValue) -> Option<SeriesEntry> {
    match value {
        JsonValue::Bool(b) => Some(SeriesEntry::Value(ParamScalar::Boolean(*b))),
        JsonValue::Number(n) => n
            .as_i64()
            .map(ParamScalar::Int)
            .or_else(|| n.as_f64().map(ParamScalar::Number))
            .map(SeriesEntry::Value),
        JsonValue::String(s) if s.trim() == "*" => Some(SeriesEntry::Wildcard),
        _ => None,
    }
}
