//! Bulk import: streams a reader into the request body.

use reqwest::blocking::Body;
use reqwest::header::CONTENT_TYPE;
use std::io::Read;

use super::client::{error_for_status, VmClient};
use super::error::ApiError;
use super::ImportApi;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    /// JSON lines as produced by `export json`
    Json,
    Csv,
    Native,
    /// Prometheus text exposition format
    Prometheus,
}

impl ImportFormat {
    fn content_type(self) -> &'static str {
        match self {
            ImportFormat::Json => "application/json",
            ImportFormat::Csv => "text/csv",
            ImportFormat::Native => "application/octet-stream",
            ImportFormat::Prometheus => "text/plain",
        }
    }
}

/// Pushgateway-style grouping labels for Prometheus imports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOptions {
    pub job: Option<String>,
    pub instance: Option<String>,
}

fn import_segments(format: ImportFormat, options: &ImportOptions) -> Vec<&str> {
    let mut segments = vec!["api", "v1", "import"];
    match format {
        ImportFormat::Json => {}
        ImportFormat::Csv => segments.push("csv"),
        ImportFormat::Native => segments.push("native"),
        ImportFormat::Prometheus => {
            segments.push("prometheus");
            if let Some(job) = options.job.as_deref().filter(|job| !job.is_empty()) {
                segments.extend(["metrics", "job", job]);
                if let Some(instance) = options.instance.as_deref().filter(|i| !i.is_empty()) {
                    segments.extend(["instance", instance]);
                }
            }
        }
    }
    segments
}

impl ImportApi for VmClient {
    fn import(
        &self,
        format: ImportFormat,
        options: &ImportOptions,
        input: Box<dyn Read + Send>,
    ) -> Result<(), ApiError> {
        let response = self
            .post(&import_segments(format, options))
            .header(CONTENT_TYPE, format.content_type())
            .body(Body::new(input))
            .send()?;
        error_for_status(response, &[200, 204])?;
        Ok(())
    }
}
