//! VictoriaMetrics HTTP API client
//!
//! The commands talk to the server through the traits below; [`VmClient`]
//! is the reqwest-backed implementation built from the resolved config.

use chrono::{DateTime, Utc};
use std::io::{Read, Write};
use std::time::Duration;

mod client;
mod error;
mod export;
mod import;
mod types;

pub use client::VmClient;
pub use error::ApiError;
pub use export::{ExportFormat, ExportOptions, DEFAULT_CSV_FORMAT};
pub use import::{ImportFormat, ImportOptions};
pub use types::{
    format_metric, format_value, ApiResponse, LabelSet, QueryResult, Sample, SampleValue,
    StringValue,
};

/// Query and discovery endpoints.
pub trait QueryApi {
    /// `GET /api/v1/query`; `time: None` lets the server pick "now".
    fn query(&self, query: &str, time: Option<DateTime<Utc>>) -> Result<QueryResult, ApiError>;

    /// `GET /api/v1/query_range`
    fn query_range(
        &self,
        query: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step: Duration,
    ) -> Result<QueryResult, ApiError>;

    /// `GET /api/v1/series`
    fn series(
        &self,
        matches: &[String],
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<LabelSet>, ApiError>;

    /// `GET /api/v1/labels`
    fn labels(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<String>, ApiError>;

    /// `GET /api/v1/label/<label>/values`
    fn label_values(
        &self,
        label: &str,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<String>, ApiError>;
}

pub trait ExportApi {
    /// Stream an export into `out`, returning the number of bytes written.
    fn export(
        &self,
        format: ExportFormat,
        options: &ExportOptions,
        out: &mut dyn Write,
    ) -> Result<u64, ApiError>;
}

pub trait ImportApi {
    fn import(
        &self,
        format: ImportFormat,
        options: &ImportOptions,
        input: Box<dyn Read + Send>,
    ) -> Result<(), ApiError>;
}
