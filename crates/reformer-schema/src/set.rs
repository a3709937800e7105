use std::collections::BTreeMap;
use std::path::Path;

use reformer_common::Year;

use crate::error::SchemaError;
use crate::param::{DataSource, LoadOptions, ParameterColumn};
use crate::snapshot::{IndexingBasis, ParamKind, SchemaSnapshot};

/// Price and wage growth rates by calendar year.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTables {
    pub price: BTreeMap<Year, f64>,
    pub wage: BTreeMap<Year, f64>,
}

impl RateTables {
    pub fn table(&self, basis: IndexingBasis) -> &BTreeMap<Year, f64> {
        match basis {
            IndexingBasis::Price => &self.price,
            IndexingBasis::Wage => &self.wage,
        }
    }
}

/// A `section_2` group inside a top-level section.
#[derive(Debug, Clone)]
pub struct SubSection<'a> {
    /// `None` for parameters listed directly under the section.
    pub name: Option<&'a str>,
    pub params: Vec<&'a ParameterColumn>,
}

/// A `section_1` group of parameters, in presentation order.
#[derive(Debug, Clone)]
pub struct Section<'a> {
    pub name: &'a str,
    pub groups: Vec<SubSection<'a>>,
}

/// Every parameter of a snapshot, built for one first simulation year.
///
/// Immutable after construction.
#[derive(Debug, Clone)]
pub struct ParameterSet {
    first_year: Year,
    data_source: DataSource,
    params: BTreeMap<String, ParameterColumn>,
    rates: RateTables,
}

impl ParameterSet {
    pub fn from_snapshot(
        snapshot: &SchemaSnapshot,
        options: &LoadOptions,
    ) -> Result<Self, SchemaError> {
        let first_year = options.first_year.unwrap_or(snapshot.first_year);
        if first_year < snapshot.first_year {
            return Err(SchemaError::YearBeforeSnapshot {
                requested: first_year,
                snapshot: snapshot.first_year,
            });
        }
        let offset = (first_year - snapshot.first_year) as usize;

        let mut params = BTreeMap::new();
        for (id, descriptor) in &snapshot.parameters {
            let column =
                ParameterColumn::from_descriptor(id, descriptor, first_year, offset, options)?;
            params.insert(id.clone(), column);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            params = params.len(),
            first_year,
            data_source = %options.data_source,
            "loaded parameter set"
        );

        Ok(Self {
            first_year,
            data_source: options.data_source,
            params,
            rates: RateTables {
                price: snapshot.price_inflation_rates.clone(),
                wage: snapshot.wage_growth_rates.clone(),
            },
        })
    }

    /// Read a snapshot from a `.json`, `.yaml`, or `.yml` file.
    pub fn load(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Self, SchemaError> {
        let snapshot = read_snapshot(path)?;
        Self::from_snapshot(&snapshot, options)
    }

    pub fn first_year(&self) -> Year {
        self.first_year
    }

    pub fn data_source(&self) -> DataSource {
        self.data_source
    }

    pub fn rates(&self) -> &RateTables {
        &self.rates
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Exact id match only.
    pub fn get_exact(&self, id: &str) -> Option<&ParameterColumn> {
        self.params.get(id)
    }

    /// Look up by canonical id, falling back to the underscore-prefixed form.
    pub fn get(&self, id: &str) -> Option<&ParameterColumn> {
        self.params
            .get(id)
            .or_else(|| self.params.get(&format!("_{id}")))
    }

    /// Look up by the id without its leading underscore.
    pub fn get_bare(&self, bare_id: &str) -> Option<&ParameterColumn> {
        self.get(bare_id)
            .filter(|p| p.bare_id == bare_id)
            .or_else(|| self.params.values().find(|p| p.bare_id == bare_id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParameterColumn> {
        self.params.values()
    }

    pub fn of_kind(&self, kind: ParamKind) -> impl Iterator<Item = &ParameterColumn> {
        self.params.values().filter(move |p| p.kind == kind)
    }

    /// Group parameters by `section_1`, then `section_2`. Parameters with no
    /// `section_1` are not presented.
    pub fn sections(&self) -> Vec<Section<'_>> {
        let mut sections: Vec<Section<'_>> = Vec::new();
        for param in self.params.values() {
            let Some(top) = param.section_1.as_deref() else {
                continue;
            };
            let idx = match sections.iter().position(|s| s.name == top) {
                Some(i) => i,
                None => {
                    sections.push(Section {
                        name: top,
                        groups: Vec::new(),
                    });
                    sections.len() - 1
                }
            };
            let sub = param.section_2.as_deref();
            let groups = &mut sections[idx].groups;
            match groups.iter_mut().find(|g| g.name.is_some() && g.name == sub) {
                Some(group) => group.params.push(param),
                None => groups.push(SubSection {
                    name: sub,
                    params: vec![param],
                }),
            }
        }
        sections
    }
}

/// Read a snapshot, choosing the format from the file extension.
pub fn read_snapshot(path: impl AsRef<Path>) -> Result<SchemaSnapshot, SchemaError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
    if is_yaml {
        Ok(SchemaSnapshot::from_yaml_str(&text)?)
    } else {
        Ok(SchemaSnapshot::from_json_str(&text)?)
    }
}
