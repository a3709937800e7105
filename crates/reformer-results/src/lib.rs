//! Result shaping for tax simulation output.
//!
//! The engine returns flat series keyed `"<row>_<year offset>"`. A
//! [`ResultsShaper`] turns them into labeled [`ResultTable`]s using a
//! [`Taxonomy`]; [`export_csv`] writes the same data in the row-oriented
//! download layout. Bundles from older engines go through
//! [`legacy::upgrade`] first.

pub mod bundle;
pub mod error;
pub mod export;
pub mod legacy;
pub mod shaper;
pub mod taxonomy;

pub use bundle::{CellInput, ResultBundle, TableSeries, year_offset};
pub use error::ResultsError;
pub use export::{CsvExportOptions, CsvNewline, csv_records, export_csv, write_records};
pub use shaper::{
    AGGREGATE_ALIASES, CellFormat, ResultCell, ResultColumn, ResultRow, ResultTable,
    ResultsShaper, ShapedResults,
};
pub use taxonomy::{ColumnFormat, ColumnSpec, RowGroup, RowSpec, TableId, TableKind, Taxonomy};
