use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use reformer_schema::ParameterSet;

use crate::config::AssemblerConfig;

static SUB_COLUMN_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+)_(\d)$").expect("sub-column suffix regex must compile"));

const CPI_SUFFIX: &str = "_cpi";

/// What a raw input key addresses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldKey {
    /// A whole single-column parameter, by canonical id.
    Scalar(String),
    /// One sub-column of a parameter. The stem is as written (bare or
    /// canonical) and is resolved against the schema at assembly time.
    SubColumn(String, usize),
    /// The inflation flag of a parameter, by canonical id.
    CpiFlag(String),
    /// A configured assumption outside the schema.
    Assumption(String),
    Unmatched(String),
}

impl FieldKey {
    /// Resolve `raw` against the schema. Exact matches win, then the
    /// underscore-prefixed form, then configured assumptions, then the
    /// `_cpi` and `_<digit>` suffixes.
    pub fn resolve(raw: &str, set: &ParameterSet, config: &AssemblerConfig) -> FieldKey {
        if let Some(param) = set.get(raw) {
            return FieldKey::Scalar(param.canonical_id.clone());
        }
        if config.assumption_keys.contains_key(raw) {
            return FieldKey::Assumption(raw.to_string());
        }
        if let Some(stem) = raw.strip_suffix(CPI_SUFFIX) {
            let canonical = match set.get(stem) {
                Some(param) => param.canonical_id.clone(),
                None if stem.starts_with('_') => stem.to_string(),
                None => format!("_{stem}"),
            };
            return FieldKey::CpiFlag(canonical);
        }
        if let Some(caps) = SUB_COLUMN_SUFFIX.captures(raw) {
            let stem = &caps[1];
            let index = caps[2].parse().unwrap_or(0);
            return FieldKey::SubColumn(stem.to_string(), index);
        }
        FieldKey::Unmatched(raw.to_string())
    }

    pub fn is_unmatched(&self) -> bool {
        matches!(self, FieldKey::Unmatched(_))
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKey::Scalar(id) => write!(f, "{id}"),
            FieldKey::SubColumn(stem, idx) => write!(f, "{stem}_{idx}"),
            FieldKey::CpiFlag(id) => write!(f, "{id}{CPI_SUFFIX}"),
            FieldKey::Assumption(name) => write!(f, "{name}"),
            FieldKey::Unmatched(raw) => write!(f, "{raw}"),
        }
    }
}
