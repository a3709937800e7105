use std::collections::{BTreeMap, BTreeSet};

use reformer_common::ParamScalar;
use reformer_schema::DataSource;

/// Form bookkeeping keys that never name a parameter.
pub const INPUT_META_KEYS: &[&str] = &[
    "has_errors",
    "csrfmiddlewaretoken",
    "start_year",
    "full_calc",
    "quick_calc",
    "first_year",
    "_state",
    "creation_date",
    "id",
    "job_ids",
    "jobs_not_ready",
    "json_text_id",
    "tax_result",
    "reform_style",
    "_micro_sim_cache",
    "micro_sim_id",
    "raw_fields",
    "data_source",
];

/// Regular-tax capital gains fields the AMT computation shares.
pub const CAPITAL_GAINS_FIELDS: &[&str] = &[
    "CG_rt1",
    "CG_brk1_0",
    "CG_brk1_1",
    "CG_brk1_2",
    "CG_brk1_3",
    "CG_brk1_cpi",
    "CG_rt2",
    "CG_brk2_0",
    "CG_brk2_1",
    "CG_brk2_2",
    "CG_brk2_3",
    "CG_brk2_cpi",
    "CG_rt3",
];

/// Prefix of the AMT counterpart of a capital gains field.
pub const AMT_PREFIX: &str = "AMT_";

/// Assembler configuration.
#[derive(Debug, Clone)]
pub struct AssemblerConfig {
    /// Keys skipped silently.
    pub ignored_keys: BTreeSet<String>,
    /// Assumptions accepted even when the schema does not define them,
    /// with their default series.
    pub assumption_keys: BTreeMap<String, Vec<ParamScalar>>,
    pub data_source: DataSource,
    /// Record out-of-bounds values as diagnostics.
    pub check_bounds: bool,
    /// Form fields whose value is copied onto a second field, by bare
    /// name. The copy replaces anything submitted for the target.
    pub mirrored_fields: BTreeMap<String, String>,
    /// Multi-column boolean parameters submitted as one checkbox per
    /// sub-column. A present checkbox switches its sub-column on.
    pub switch_groups: BTreeSet<String>,
    /// Minimum number of years a reform file may span; the schema's
    /// longest default series extends it.
    pub max_years: usize,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            ignored_keys: INPUT_META_KEYS.iter().map(|k| k.to_string()).collect(),
            assumption_keys: BTreeMap::from([(
                "elastic_gdp".to_string(),
                vec![ParamScalar::Number(0.54)],
            )]),
            data_source: DataSource::default(),
            check_bounds: true,
            mirrored_fields: CAPITAL_GAINS_FIELDS
                .iter()
                .map(|f| (f.to_string(), format!("{AMT_PREFIX}{f}")))
                .collect(),
            switch_groups: BTreeSet::from(["ID_BenefitSurtax_Switch".to_string()]),
            max_years: 10,
        }
    }
}

impl AssemblerConfig {
    pub fn with_data_source(mut self, data_source: DataSource) -> Self {
        self.data_source = data_source;
        self
    }

    pub fn is_ignored(&self, key: &str) -> bool {
        self.ignored_keys.contains(key)
    }

    /// The field `key` is mirrored onto, keeping a leading underscore.
    pub fn mirror_of(&self, key: &str) -> Option<String> {
        let (prefix, bare) = match key.strip_prefix('_') {
            Some(bare) => ("_", bare),
            None => ("", key),
        };
        self.mirrored_fields
            .get(bare)
            .map(|target| format!("{prefix}{target}"))
    }

    /// Sub-column index when `key` is one checkbox of a switch group.
    pub fn switch_index(&self, key: &str) -> Option<usize> {
        let bare = key.strip_prefix('_').unwrap_or(key);
        let (stem, index) = bare.rsplit_once('_')?;
        if !self.switch_groups.contains(stem) {
            return None;
        }
        index.parse().ok()
    }
}
