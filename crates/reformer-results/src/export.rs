//! CSV export of a result bundle.
//!
//! Layout:
//!
//! ```text
//! #URL: http://www.ospc.org/taxbrain/<id>/
//! #aggr_2
//! YEAR_0,...,YEAR_K
//! payroll_tax
//! val,...,val
//! combined_tax
//! val,...,val
//! ind_tax
//! val,...,val
//! #dist1_xdec
//! YEAR_0
//! col_0,...,col_n
//! val,...,val
//! ...
//! ```

use std::io::Write;

use reformer_common::Year;

use crate::bundle::ResultBundle;
use crate::error::ResultsError;
use crate::taxonomy::{TableId, Taxonomy};

/// Header of the aggregate section. Existing consumers expect this name;
/// the section carries the change table.
pub const AGGREGATE_SECTION: (&str, TableId) = ("#aggr_2", TableId::AggrD);

/// Aggregate rows in export order.
pub const AGGREGATE_ROW_ORDER: [&str; 3] = ["payroll_tax", "combined_tax", "ind_tax"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CsvNewline {
    #[default]
    Lf,
    Crlf,
}

#[derive(Clone, Debug)]
pub struct CsvExportOptions {
    /// Prefix of the results-page link written on the first line.
    pub url_base: String,
    /// Results-page id; no link line is written without one.
    pub url_id: Option<String>,
    pub delimiter: u8,
    pub newline: CsvNewline,
    /// Multi-year tables exported after the aggregate section, in order.
    pub sections: Vec<TableId>,
}

impl Default for CsvExportOptions {
    fn default() -> Self {
        Self {
            url_base: "http://www.ospc.org/taxbrain/".to_string(),
            url_id: None,
            delimiter: b',',
            newline: CsvNewline::Lf,
            sections: vec![
                TableId::Dist1Xdec,
                TableId::Dist2Xdec,
                TableId::DiffItaxXdec,
                TableId::Dist1Xbin,
                TableId::Dist2Xbin,
                TableId::DiffItaxXbin,
            ],
        }
    }
}

impl CsvExportOptions {
    pub fn with_url_id(mut self, id: impl Into<String>) -> Self {
        self.url_id = Some(id.into());
        self
    }
}

fn missing(id: TableId, key: &str) -> ResultsError {
    ResultsError::MissingSeries {
        table: id.to_string(),
        key: key.to_string(),
    }
}

/// Build the export as records of varying width.
pub fn csv_records(
    bundle: &ResultBundle,
    taxonomy: &Taxonomy,
    first_year: Year,
    options: &CsvExportOptions,
) -> Result<Vec<Vec<String>>, ResultsError> {
    let mut records: Vec<Vec<String>> = Vec::new();

    if let Some(id) = &options.url_id {
        records.push(vec![format!("#URL: {}{id}/", options.url_base)]);
    }

    let (header, aggregate_id) = AGGREGATE_SECTION;
    records.push(vec![header.to_string()]);
    let aggregate = bundle.table(aggregate_id);
    let num_years = aggregate
        .and_then(|t| t.get("ind_tax"))
        .map_or_else(|| bundle.num_years(), Vec::len);
    let years: Vec<Year> = (0..num_years).map(|i| first_year + i as Year).collect();
    if !years.is_empty() {
        records.push(years.iter().map(Year::to_string).collect());
    }
    if let Some(table) = aggregate {
        for key in AGGREGATE_ROW_ORDER {
            let values = table.get(key).ok_or_else(|| missing(aggregate_id, key))?;
            records.push(vec![key.to_string()]);
            records.push(values.iter().map(ToString::to_string).collect());
        }
    }

    for &id in &options.sections {
        records.push(vec![format!("#{id}")]);
        let Some(table) = bundle.table(id) else {
            continue;
        };
        let labels: Vec<String> = taxonomy
            .columns(id)
            .unwrap_or_default()
            .iter()
            .map(|c| c.label.clone())
            .collect();
        for (offset, year) in years.iter().enumerate() {
            records.push(vec![year.to_string()]);
            records.push(labels.clone());
            for row in taxonomy.rows(id) {
                let key = format!("{}_{offset}", row.key);
                let values = table.get(&key).ok_or_else(|| missing(id, &key))?;
                records.push(values.iter().map(ToString::to_string).collect());
            }
        }
    }

    Ok(records)
}

/// Write records with the configured delimiter and line ending.
pub fn write_records<W: Write>(
    writer: W,
    records: &[Vec<String>],
    options: &CsvExportOptions,
) -> Result<(), ResultsError> {
    let terminator = match options.newline {
        CsvNewline::Lf => csv::Terminator::Any(b'\n'),
        CsvNewline::Crlf => csv::Terminator::CRLF,
    };
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(options.delimiter)
        .terminator(terminator)
        .flexible(true)
        .from_writer(writer);
    for record in records {
        wtr.write_record(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Export a bundle to CSV text.
pub fn export_csv(
    bundle: &ResultBundle,
    taxonomy: &Taxonomy,
    first_year: Year,
    options: &CsvExportOptions,
) -> Result<String, ResultsError> {
    let records = csv_records(bundle, taxonomy, first_year, options)?;
    let mut buf = Vec::new();
    write_records(&mut buf, &records, options)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
