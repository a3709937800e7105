use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::error::ResultsError;
use crate::taxonomy::TableId;

/// One raw result value as the engine sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellInput {
    Number(f64),
    Text(String),
}

impl CellInput {
    /// Numeric value, ignoring a trailing `%`.
    pub fn numeric(&self) -> Option<f64> {
        match self {
            CellInput::Number(n) => Some(*n),
            CellInput::Text(s) => {
                let s = s.trim();
                s.strip_suffix('%').unwrap_or(s).trim().parse().ok()
            }
        }
    }
}

impl From<&str> for CellInput {
    fn from(text: &str) -> Self {
        CellInput::Text(text.to_string())
    }
}

impl From<f64> for CellInput {
    fn from(value: f64) -> Self {
        CellInput::Number(value)
    }
}

impl fmt::Display for CellInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellInput::Number(n) => write!(f, "{n}"),
            CellInput::Text(s) => f.write_str(s),
        }
    }
}

/// Series of one table, keyed `"<row>_<year offset>"` for multi-year
/// tables and `"<row>"` for aggregate tables.
pub type TableSeries = BTreeMap<String, Vec<CellInput>>;

/// Everything one simulation run returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultBundle {
    /// Version of the engine that produced the results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_version: Option<String>,
    #[serde(flatten)]
    pub tables: BTreeMap<String, TableSeries>,
}

impl ResultBundle {
    pub fn from_json_str(json: &str) -> Result<Self, ResultsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ResultsError> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn table(&self, id: TableId) -> Option<&TableSeries> {
        self.tables.get(id.as_str())
    }

    /// Number of simulated years. Taken from the first aggregate change
    /// row when present, otherwise from the highest year offset found in
    /// any multi-year table.
    pub fn num_years(&self) -> usize {
        let change_row = self
            .table(TableId::AggrD)
            .and_then(|change| change.get("ind_tax").or_else(|| change.values().next()));
        if let Some(row) = change_row {
            return row.len();
        }
        self.tables
            .iter()
            .filter(|(id, _)| {
                id.parse::<TableId>()
                    .map(|id| id.is_multi_year())
                    .unwrap_or(false)
            })
            .flat_map(|(_, series)| series.keys())
            .filter_map(|key| year_offset(key))
            .max()
            .map_or(0, |max| max + 1)
    }
}

/// Year offset of a `"<row>_<n>"` key.
pub fn year_offset(key: &str) -> Option<usize> {
    let (_, suffix) = key.rsplit_once('_')?;
    suffix.parse().ok()
}
