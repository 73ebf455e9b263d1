//! Bulk export: streams the server response straight into a writer.

use chrono::{DateTime, Utc};
use std::io::Write;

use super::client::{error_for_status, time_range, VmClient};
use super::error::ApiError;
use super::ExportApi;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// JSON lines, one series per line
    Json,
    Csv,
    /// VictoriaMetrics native binary format
    Native,
}

impl ExportFormat {
    fn segments(self) -> &'static [&'static str] {
        match self {
            ExportFormat::Json => &["api", "v1", "export"],
            ExportFormat::Csv => &["api", "v1", "export", "csv"],
            ExportFormat::Native => &["api", "v1", "export", "native"],
        }
    }
}

pub const DEFAULT_CSV_FORMAT: &str = "__name__,__value__,__timestamp__:unix_s";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Series selectors, sent as repeated `match[]`.
    pub matches: Vec<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    /// JSON only; zero means the server default.
    pub max_rows_per_line: usize,
    /// CSV only: column definition.
    pub csv_format: String,
    /// CSV only: skip deduplication on the server.
    pub reduce_mem_usage: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            matches: Vec::new(),
            start: None,
            end: None,
            max_rows_per_line: 0,
            csv_format: DEFAULT_CSV_FORMAT.to_string(),
            reduce_mem_usage: false,
        }
    }
}

impl ExportOptions {
    fn params(&self, format: ExportFormat) -> Vec<(&'static str, String)> {
        let mut params: Vec<_> = self.matches.iter().map(|m| ("match[]", m.clone())).collect();
        params.extend(time_range(self.start, self.end));
        match format {
            ExportFormat::Json if self.max_rows_per_line > 0 => {
                params.push(("max_rows_per_line", self.max_rows_per_line.to_string()));
            }
            ExportFormat::Csv => {
                if !self.csv_format.is_empty() {
                    params.push(("format", self.csv_format.clone()));
                }
                if self.reduce_mem_usage {
                    params.push(("reduce_mem_usage", "1".to_string()));
                }
            }
            _ => {}
        }
        params
    }
}

impl ExportApi for VmClient {
    fn export(
        &self,
        format: ExportFormat,
        options: &ExportOptions,
        out: &mut dyn Write,
    ) -> Result<u64, ApiError> {
        let response = self.get(format.segments()).query(&options.params(format)).send()?;
        let mut response = error_for_status(response, &[200])?;
        let written = response.copy_to(out)?;
        out.flush()?;
        tracing::debug!("Exported {} bytes", written);
        Ok(written)
    }
}
