use std::collections::{BTreeMap, BTreeSet};

use reformer_common::ParamScalar;
use reformer_schema::{DataSource, ParamKind, ParameterColumn, ParameterSet};

use crate::config::AssemblerConfig;
use crate::error::ReformError;
use crate::input::{FormInput, JsonReformFile, Override, OverrideSet};
use crate::keys::FieldKey;
use crate::propagate::{Propagator, SeriesEntry};
use crate::rates::IndexingRates;
use crate::reform::{AssembledReform, Diagnostic, ExpandedParameter, ExpandedValues};

/// Sub-column overrides of one parameter: `(raw key, index, entries)`.
type SubOverrides = Vec<(String, usize, Vec<SeriesEntry>)>;

/// A scalar override: `(group, raw key, parameter, entries)`.
type ScalarOverride<'p> = (Option<String>, String, &'p ParameterColumn, Vec<SeriesEntry>);

/// A resolved column awaiting its bounds check: `(assumption group or
/// `None` for policy, parameter, sub-column, raw key)`.
type PendingBounds<'p> = (Option<String>, &'p ParameterColumn, usize, String);

/// Turns sparse overrides into a complete reform against one parameter set.
#[derive(Debug, Clone)]
pub struct ReformAssembler<'a> {
    set: &'a ParameterSet,
    rates: IndexingRates,
    config: AssemblerConfig,
}

impl<'a> ReformAssembler<'a> {
    pub fn new(set: &'a ParameterSet) -> Self {
        Self::with_config(set, AssemblerConfig::default())
    }

    pub fn with_config(set: &'a ParameterSet, config: AssemblerConfig) -> Self {
        Self {
            set,
            rates: IndexingRates::from_set(set),
            config,
        }
    }

    /// Replace the indexing rates taken from the parameter set.
    pub fn with_rates(mut self, rates: IndexingRates) -> Self {
        self.rates = rates;
        self
    }

    pub fn parameter_set(&self) -> &ParameterSet {
        self.set
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Number of years a reform file may cover.
    pub fn horizon(&self) -> usize {
        self.set
            .iter()
            .map(ParameterColumn::num_years)
            .max()
            .unwrap_or(0)
            .max(self.config.max_years)
    }

    /// Parse and assemble a form submission.
    pub fn assemble_form(&self, form: FormInput) -> Result<AssembledReform, ReformError> {
        let overrides = form.into_overrides(self.set, &self.config)?;
        self.assemble(overrides)
    }

    /// Assemble a year-keyed reform file.
    pub fn assemble_file(&self, file: &JsonReformFile) -> Result<AssembledReform, ReformError> {
        let overrides = file.to_overrides(self.set.first_year(), self.horizon())?;
        self.assemble(overrides)
    }

    pub fn assemble(&self, overrides: OverrideSet) -> Result<AssembledReform, ReformError> {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("assemble_reform", overrides = overrides.len()).entered();

        let first_year = self.set.first_year();
        let mut reform = AssembledReform {
            first_year,
            ..AssembledReform::default()
        };

        let mut scalars: Vec<ScalarOverride<'a>> = Vec::new();
        let mut groups: BTreeMap<(Option<String>, String), (&'a ParameterColumn, SubOverrides)> =
            BTreeMap::new();
        let mut assumptions: Vec<(Option<String>, String, Vec<SeriesEntry>)> = Vec::new();
        let mut bare_cpi: BTreeSet<String> = BTreeSet::new();
        let mut pending: Vec<PendingBounds<'a>> = Vec::new();

        for Override {
            group,
            key: raw,
            entries,
        } in overrides
        {
            if self.config.is_ignored(&raw) {
                continue;
            }
            match FieldKey::resolve(&raw, self.set, &self.config) {
                FieldKey::Scalar(id) => {
                    let param = self.lookup(&raw, &id)?;
                    scalars.push((group, raw, param, entries));
                }
                FieldKey::SubColumn(stem, index) => {
                    let param = self.lookup(&raw, &stem)?;
                    // `<id>_0` of a single-column parameter is the parameter itself.
                    if index == 0 && param.sub_column_count() <= 1 {
                        scalars.push((group, raw, param, entries));
                        continue;
                    }
                    groups
                        .entry((group, param.canonical_id.clone()))
                        .or_insert_with(|| (param, Vec::new()))
                        .1
                        .push((raw, index, entries));
                }
                FieldKey::CpiFlag(id) => {
                    // A wildcard or empty flag leaves the schema default in place.
                    let Some(flag) = entries.iter().find_map(SeriesEntry::as_value) else {
                        continue;
                    };
                    // `<p>_cpi` takes precedence over `_<p>_cpi`.
                    if !raw.starts_with('_') {
                        bare_cpi.insert(id.clone());
                        reform.cpi_flags.insert(id, flag.is_truthy());
                    } else if !bare_cpi.contains(&id) {
                        reform.cpi_flags.insert(id, flag.is_truthy());
                    }
                }
                FieldKey::Assumption(name) => assumptions.push((group, name, entries)),
                FieldKey::Unmatched(key) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(key = %key, "dropping reform field with no matching parameter");
                    reform.diagnostics.push(Diagnostic::DroppedKey { key });
                }
            }
        }

        for ((group, _), (param, subs)) in groups {
            self.note_data_source(param, &subs[0].0, &mut reform.diagnostics);
            let cpi = cpi_for(param, &reform.cpi_flags);
            let (rows, touched) = self.expand_matrix(param, &subs, cpi)?;
            let target = insert(
                &mut reform,
                group,
                ExpandedParameter {
                    parameter_id: param.canonical_id.clone(),
                    kind: param.kind,
                    values: ExpandedValues::Matrix(rows),
                    cpi_flag: cpi,
                },
            );
            for (index, raw) in touched {
                pending.push((target.clone(), param, index, raw));
            }
        }

        for (group, raw, param, entries) in scalars {
            let count = param.sub_column_count();
            if count > 1 {
                return Err(ReformError::NotScalar { key: raw, count });
            }
            self.note_data_source(param, &raw, &mut reform.diagnostics);
            let cpi = cpi_for(param, &reform.cpi_flags);
            let defaults = param.defaults(0);
            let len = entries.len().max(defaults.len());
            let rates = self.rates.for_update(param.indexing, first_year, len);
            let values = Propagator::new(&param.bare_id, cpi, &rates).run(&entries, defaults)?;
            let target = insert(
                &mut reform,
                group,
                ExpandedParameter {
                    parameter_id: param.canonical_id.clone(),
                    kind: param.kind,
                    values: ExpandedValues::Series(values),
                    cpi_flag: cpi,
                },
            );
            pending.push((target, param, 0, raw));
        }

        for (group, name, entries) in assumptions {
            let defaults = self
                .config
                .assumption_keys
                .get(&name)
                .map_or(&[][..], Vec::as_slice);
            let values = Propagator::new(&name, false, &[]).run(&entries, defaults)?;
            insert(
                &mut reform,
                group,
                ExpandedParameter {
                    parameter_id: name,
                    kind: ParamKind::Elasticity,
                    values: ExpandedValues::Series(values),
                    cpi_flag: false,
                },
            );
        }

        if self.config.check_bounds {
            let found = self.bounds_diagnostics(&reform, &pending);
            reform.diagnostics.extend(found);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            policy = reform.policy.len(),
            assumption_groups = reform.assumptions.len(),
            cpi_flags = reform.cpi_flags.len(),
            diagnostics = reform.diagnostics.len(),
            "assembled reform"
        );

        Ok(reform)
    }

    fn lookup(&self, raw: &str, id: &str) -> Result<&'a ParameterColumn, ReformError> {
        self.set.get(id).ok_or_else(|| ReformError::UnknownParameter {
            key: raw.to_string(),
            param: id.to_string(),
        })
    }

    /// Expand a multi-valued parameter to year-major rows. Overridden
    /// sub-columns are propagated from the user's entries; the others from
    /// their own defaults, so every row is complete. Also returns the
    /// overridden sub-columns with the key that set them.
    fn expand_matrix(
        &self,
        param: &ParameterColumn,
        subs: &SubOverrides,
        cpi: bool,
    ) -> Result<(Vec<Vec<ParamScalar>>, Vec<(usize, String)>), ReformError> {
        let count = param.sub_column_count();
        if let Some((raw, index, _)) = subs.iter().find(|(_, i, _)| *i >= count) {
            return Err(ReformError::SubColumnOutOfRange {
                key: raw.clone(),
                index: *index,
                count,
            });
        }

        let user_len = subs.iter().map(|(_, _, e)| e.len()).max().unwrap_or(0);
        let len = user_len.max(param.num_years());
        let rates = self
            .rates
            .for_update(param.indexing, self.set.first_year(), len);
        let naming = param.naming();

        let mut columns: Vec<Vec<ParamScalar>> = Vec::with_capacity(count);
        let mut touched = Vec::new();
        for index in 0..count {
            let field_id = naming.field_id(&param.bare_id, index);
            let defaults = param.defaults(index);
            let propagator = Propagator::new(&field_id, cpi, &rates).with_min_len(len);
            let column = match subs.iter().rev().find(|(_, i, _)| *i == index) {
                Some((raw, _, entries)) => {
                    touched.push((index, raw.clone()));
                    propagator
                        .run(entries, defaults)?
                        .into_iter()
                        .map(whole_above_one)
                        .collect()
                }
                None => {
                    let entries: Vec<SeriesEntry> =
                        defaults.iter().copied().map(SeriesEntry::Value).collect();
                    propagator.run(&entries, defaults)?
                }
            };
            columns.push(column);
        }

        let rows = (0..len)
            .map(|year| columns.iter().map(|c| c[year]).collect())
            .collect();
        Ok((rows, touched))
    }

    fn note_data_source(&self, param: &ParameterColumn, key: &str, diagnostics: &mut Vec<Diagnostic>) {
        let applies = match self.config.data_source {
            DataSource::Puf => param.applicable_to.puf,
            DataSource::Cps => param.applicable_to.cps,
        };
        if !applies {
            #[cfg(feature = "tracing")]
            tracing::warn!(key, data_source = %self.config.data_source, "parameter does not apply to data source");
            diagnostics.push(Diagnostic::IncompatibleData {
                key: key.to_string(),
                data_source: self.config.data_source.to_string(),
            });
        }
    }

    /// Bounds of every user-set column. A bound naming another parameter
    /// compares against that parameter's value in this reform when it was
    /// overridden, else against its defaults.
    fn bounds_diagnostics(
        &self,
        reform: &AssembledReform,
        pending: &[PendingBounds<'_>],
    ) -> Vec<Diagnostic> {
        let mut found = Vec::new();
        for (group, param, index, raw) in pending {
            let expanded = match group {
                Some(group) => reform.assumption(group, &param.canonical_id),
                None => reform.policy.get(&param.canonical_id),
            };
            let Some(expanded) = expanded else { continue };
            let values = expanded.values.column(*index);
            let violations = param.check_bounds_with(self.set, *index, &values, |bare, idx| {
                let other = self.set.get_bare(bare)?;
                reform
                    .policy
                    .get(&other.canonical_id)
                    .map(|p| p.values.column(idx))
            });
            found.extend(violations.into_iter().map(|violation| Diagnostic::OutOfBounds {
                key: raw.clone(),
                message: violation.to_string(),
            }));
        }
        found
    }
}

/// The user's flag if given, else the schema default.
fn cpi_for(param: &ParameterColumn, flags: &BTreeMap<String, bool>) -> bool {
    flags
        .get(&param.canonical_id)
        .copied()
        .unwrap_or_else(|| param.inflation_flag_default())
}

/// Sub-column values above 1.0 are sent as integers.
fn whole_above_one(value: ParamScalar) -> ParamScalar {
    match value {
        ParamScalar::Number(n) if n > 1.0 => value.truncated(),
        other => other,
    }
}

/// Engine group of a parameter submitted without one.
fn default_group(kind: ParamKind) -> &'static str {
    match kind {
        ParamKind::Growdiff => "growdiff_response",
        other => other.as_str(),
    }
}

/// Store `param` under `group` (or its kind's default group) and return
/// the assumption group it landed in, `None` for policy.
fn insert(
    reform: &mut AssembledReform,
    group: Option<String>,
    param: ExpandedParameter,
) -> Option<String> {
    let group = group.unwrap_or_else(|| default_group(param.kind).to_string());
    if group == ParamKind::Policy.as_str() {
        reform.policy.insert(param.parameter_id.clone(), param);
        return None;
    }
    reform
        .assumptions
        .entry(group.clone())
        .or_default()
        .insert(param.parameter_id.clone(), param);
    Some(group)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reformer_schema::{LoadOptions, SchemaSnapshot};
    use reformer_testkit::POLICY_SNAPSHOT_JSON;

    fn set() -> ParameterSet {
        let snapshot = SchemaSnapshot::from_json_str(POLICY_SNAPSHOT_JSON).unwrap();
        ParameterSet::from_snapshot(&snapshot, &LoadOptions::default()).unwrap()
    }

    #[test]
    fn touched_sub_column_values_are_truncated() {
        let set = set();
        let mut overrides = OverrideSet::new();
        overrides.insert_values("II_brk2_1", [80000.7]);
        let reform = ReformAssembler::new(&set).assemble(overrides).unwrap();
        let ExpandedValues::Matrix(rows) = &reform.policy["_II_brk2"].values else {
            panic!("expected a matrix");
        };
        assert_eq!(rows[0][1], ParamScalar::Int(80000));
        assert_eq!(rows[0][0], ParamScalar::Int(37950));
    }

    #[test]
    fn out_of_range_sub_column_is_fatal() {
        let set = set();
        let mut overrides = OverrideSet::new();
        overrides.insert_values("II_brk2_7", [1.0]);
        let err = ReformAssembler::new(&set).assemble(overrides).unwrap_err();
        assert!(matches!(err, ReformError::SubColumnOutOfRange { index: 7, count: 4, .. }));
    }

    #[test]
    fn unknown_stem_is_fatal() {
        let set = set();
        let mut overrides = OverrideSet::new();
        overrides.insert_values("NoSuchParam_0", [1.0]);
        let err = ReformAssembler::new(&set).assemble(overrides).unwrap_err();
        match err {
            ReformError::UnknownParameter { key, param } => {
                assert_eq!(key, "NoSuchParam_0");
                assert_eq!(param, "NoSuchParam");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn configured_assumption_uses_configured_default() {
        let set = set();
        let mut config = AssemblerConfig::default();
        config
            .assumption_keys
            .insert("elastic_ltcg".into(), vec![ParamScalar::Number(0.2); 2]);
        let mut overrides = OverrideSet::new();
        overrides.insert("elastic_ltcg", vec![SeriesEntry::Wildcard, SeriesEntry::Gap]);
        let reform = ReformAssembler::with_config(&set, config)
            .assemble(overrides)
            .unwrap();
        assert_eq!(
            reform.assumption("elasticity", "elastic_ltcg").unwrap().values,
            ExpandedValues::Series(vec![ParamScalar::Number(0.2); 2])
        );
    }
}
