//! Output rendering (table, JSON, CSV, ASCII graph)

use anyhow::{bail, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::io::Write;

use crate::api::{LabelSet, QueryResult};

pub mod csv;
pub mod graph;
pub mod json;
pub mod table;

pub use self::csv::CsvWriter;
pub use graph::GraphWriter;
pub use json::JsonWriter;
pub use table::TableWriter;

/// Names accepted by [`new_writer`].
pub const FORMATS: &[&str] = &["table", "json", "csv", "graph"];

/// A formatter for command results.
pub trait Writer {
    /// Instant or range query results.
    fn write_query_result(&mut self, result: &QueryResult) -> Result<()>;

    /// Plain lists: metric names, label names, label values.
    fn write_strings(&mut self, items: &[String]) -> Result<()>;

    fn write_series(&mut self, series: &[LabelSet]) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    /// Omit header rows (table and CSV).
    pub no_headers: bool,
}

/// Writer for `format`; an empty name means table.
pub fn new_writer<'a>(
    format: &str,
    out: Box<dyn Write + 'a>,
    options: Options,
) -> Result<Box<dyn Writer + 'a>> {
    let writer: Box<dyn Writer + 'a> = match format {
        "table" | "" => Box::new(TableWriter::new(out, options)),
        "json" => Box::new(JsonWriter::new(out)),
        "csv" => Box::new(CsvWriter::new(out, options)),
        "graph" => Box::new(GraphWriter::new(out, options)),
        other => bail!("unsupported output format: {other}"),
    };
    Ok(writer)
}

pub(crate) fn format_time(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}
