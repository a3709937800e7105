//! Reform assembly.
//!
//! User input arrives as sparse, partially specified overrides: a form
//! submission of comma-separated fields or a year-keyed reform file. The
//! [`ReformAssembler`] resolves every key against a [`ParameterSet`],
//! fills each series out to the full simulation window using schema defaults
//! and inflation indexing, and returns an [`AssembledReform`] ready for
//! the simulation engine.
//!
//! ```no_run
//! use reformer_expand::{FormInput, ReformAssembler};
//! use reformer_schema::{LoadOptions, ParameterSet};
//!
//! let set = ParameterSet::load("policy.json", &LoadOptions::default())?;
//! let form = FormInput::new().with_field("II_em", "5000,*,6000");
//! let reform = ReformAssembler::new(&set).assemble_form(form)?;
//! println!("{}", reform.to_engine_json()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! [`ParameterSet`]: reformer_schema::ParameterSet

pub mod assemble;
pub mod config;
pub mod error;
pub mod input;
pub mod keys;
pub mod propagate;
pub mod rates;
pub mod reform;

pub use assemble::ReformAssembler;
pub use config::{AMT_PREFIX, AssemblerConfig, CAPITAL_GAINS_FIELDS, INPUT_META_KEYS};
pub use error::ReformError;
pub use input::{FormInput, JsonReformFile, Override, OverrideSet};
pub use keys::FieldKey;
pub use propagate::{Propagator, SeriesEntry, SeriesKind, propagate};
pub use rates::IndexingRates;
pub use reform::{AssembledReform, Diagnostic, ExpandedParameter, ExpandedValues};
