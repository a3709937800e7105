use std::fmt;

use reformer_common::{ParamScalar, Year};

use crate::param::{Bound, ParameterColumn};
use crate::set::ParameterSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundSide {
    Min,
    Max,
}

/// A value that falls outside its parameter's min or max.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundViolation {
    pub field: String,
    pub year: Year,
    pub value: f64,
    pub limit: f64,
    pub side: BoundSide,
    /// Bare id of the parameter the limit came from, for field bounds.
    pub source: Option<String>,
}

impl fmt::Display for BoundViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let relation = match self.side {
            BoundSide::Min => "less than the min",
            BoundSide::Max => "greater than the max",
        };
        write!(
            f,
            "{} value {} is {} value {}",
            self.field, self.value, relation, self.limit
        )?;
        if let Some(source) = &self.source {
            write!(f, " ({source})")?;
        }
        write!(f, " for {}", self.year)
    }
}

impl ParameterColumn {
    /// Check a resolved series for one sub-column against the schema bounds.
    /// Field bounds compare against the referenced parameter's defaults.
    pub fn check_bounds(
        &self,
        set: &ParameterSet,
        sub_column: usize,
        values: &[ParamScalar],
    ) -> Vec<BoundViolation> {
        self.check_bounds_with(set, sub_column, values, |_, _| None)
    }

    /// As [`Self::check_bounds`], but a field bound first asks `overridden`
    /// for the referenced parameter's series, given its bare id and the
    /// sub-column compared against. `None` falls back to the defaults.
    pub fn check_bounds_with<F>(
        &self,
        set: &ParameterSet,
        sub_column: usize,
        values: &[ParamScalar],
        overridden: F,
    ) -> Vec<BoundViolation>
    where
        F: Fn(&str, usize) -> Option<Vec<ParamScalar>>,
    {
        let field = self
            .field(sub_column)
            .map_or_else(|| self.bare_id.clone(), |f| f.id.clone());
        let mut violations = Vec::new();
        for (side, bound) in [(BoundSide::Min, &self.min_bound), (BoundSide::Max, &self.max_bound)] {
            let Some(bound) = bound else { continue };
            let (limits, source): (Vec<f64>, Option<String>) = match bound {
                Bound::Value(v) => (vec![*v], None),
                Bound::Field(id) => {
                    let Some(other) = set.get_bare(id) else { continue };
                    let idx = if sub_column < other.sub_column_count() {
                        sub_column
                    } else {
                        0
                    };
                    let series = overridden(id, idx)
                        .filter(|s| !s.is_empty())
                        .unwrap_or_else(|| other.defaults(idx).to_vec());
                    (series.iter().map(ParamScalar::as_f64).collect(), Some(id.clone()))
                }
            };
            if limits.is_empty() {
                continue;
            }
            for (i, value) in values.iter().enumerate() {
                if value.is_boolean() {
                    continue;
                }
                let value = value.as_f64();
                let limit = limits[i.min(limits.len() - 1)];
                let out = match side {
                    BoundSide::Min => value < limit,
                    BoundSide::Max => value > limit,
                };
                if out {
                    violations.push(BoundViolation {
                        field: field.clone(),
                        year: self.start_year + i as Year,
                        value,
                        limit,
                        side,
                        source: source.clone(),
                    });
                }
            }
        }
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::LoadOptions;
    use crate::snapshot::example_data::exemption_example;

    #[test]
    fn static_min_is_enforced() {
        let set = ParameterSet::from_snapshot(&exemption_example(), &LoadOptions::default()).unwrap();
        let em = set.get("II_em").unwrap();
        let found = em.check_bounds(&set, 0, &[ParamScalar::Int(100), ParamScalar::Int(-5)]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].year, 2018);
        assert_eq!(
            found[0].to_string(),
            "II_em value -5 is less than the min value 0 for 2018"
        );
    }

    #[test]
    fn field_bound_prefers_overridden_series() {
        let snapshot =
            crate::SchemaSnapshot::from_json_str(reformer_testkit::POLICY_SNAPSHOT_JSON).unwrap();
        let set = ParameterSet::from_snapshot(&snapshot, &LoadOptions::default()).unwrap();
        let brk1 = set.get("II_brk1").unwrap();
        let values = [ParamScalar::Int(20000), ParamScalar::Int(20000)];

        // Default II_brk2_0 is 37950, so 20000 is within bounds.
        assert!(brk1.check_bounds(&set, 0, &values).is_empty());

        let found = brk1.check_bounds_with(&set, 0, &values, |id, idx| {
            (id == "II_brk2" && idx == 0).then(|| vec![ParamScalar::Int(15000); 2])
        });
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].side, BoundSide::Max);
        assert_eq!(
            found[0].to_string(),
            "II_brk1_0 value 20000 is greater than the max value 15000 (II_brk2) for 2017"
        );
    }
}
