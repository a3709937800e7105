//! Meta crate that re-exports the Reformer building blocks. Depend on this
//! crate and opt into layers via feature flags; the underlying crates stay
//! reachable for deeper integration.

#[cfg(feature = "common")]
pub use reformer_common as common;

#[cfg(feature = "parse")]
pub use reformer_parse as parse;

#[cfg(feature = "schema")]
pub use reformer_schema as schema;

#[cfg(feature = "expand")]
pub use reformer_expand as expand;

#[cfg(feature = "results")]
pub use reformer_results as results;

#[cfg(feature = "schema")]
pub use reformer_schema::{DataSource, LoadOptions, ParameterSet, SchemaSnapshot};

#[cfg(feature = "expand")]
pub use reformer_expand::{
    AssembledReform, AssemblerConfig, FormInput, JsonReformFile, ReformAssembler, ReformError,
};

#[cfg(feature = "results")]
pub use reformer_results::{
    CsvExportOptions, ResultBundle, ResultsError, ResultsShaper, ShapedResults, Taxonomy,
};
