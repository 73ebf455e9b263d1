//! CSV output (RFC 4180 quoting).

use anyhow::Result;
use std::io::Write;

use super::{format_time, Options, Writer};
use crate::api::{format_metric, format_value, LabelSet, QueryResult};

pub struct CsvWriter<'a> {
    out: Box<dyn Write + 'a>,
    options: Options,
}

impl<'a> CsvWriter<'a> {
    pub fn new(out: Box<dyn Write + 'a>, options: Options) -> Self {
        Self { out, options }
    }

    fn header(&mut self, columns: &[&str]) -> Result<()> {
        if !self.options.no_headers {
            self.record(columns)?;
        }
        Ok(())
    }

    fn record<S: AsRef<str>>(&mut self, fields: &[S]) -> Result<()> {
        let line: Vec<String> = fields.iter().map(|f| escape(f.as_ref())).collect();
        writeln!(self.out, "{}", line.join(","))?;
        Ok(())
    }
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

impl Writer for CsvWriter<'_> {
    fn write_query_result(&mut self, result: &QueryResult) -> Result<()> {
        match result {
            QueryResult::Vector(samples) | QueryResult::Matrix(samples) => {
                self.header(&["metric", "value", "timestamp"])?;
                for sample in samples {
                    let metric = format_metric(&sample.metric);
                    for point in sample.value.iter().chain(&sample.values) {
                        self.record(&[
                            metric.clone(),
                            format_value(point.value),
                            format_time(&point.time()),
                        ])?;
                    }
                }
            }
            QueryResult::Scalar(value) => {
                self.header(&["value", "timestamp"])?;
                self.record(&[format_value(value.value), format_time(&value.time())])?;
            }
            QueryResult::String(value) => {
                self.header(&["value", "timestamp"])?;
                self.record(&[value.value().to_string(), format_time(&value.time())])?;
            }
        }
        self.out.flush()?;
        Ok(())
    }

    fn write_strings(&mut self, items: &[String]) -> Result<()> {
        self.header(&["name"])?;
        for item in items {
            self.record(&[item])?;
        }
        self.out.flush()?;
        Ok(())
    }

    fn write_series(&mut self, series: &[LabelSet]) -> Result<()> {
        self.header(&["series"])?;
        for labels in series {
            self.record(&[format_metric(labels)])?;
        }
        self.out.flush()?;
        Ok(())
    }
}
