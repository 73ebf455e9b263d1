//! Aligned plain-text tables.

use anyhow::Result;
use console::style;
use std::io::Write;
use unicode_width::UnicodeWidthStr;

use super::{format_time, Options, Writer};
use crate::api::{format_metric, format_value, LabelSet, QueryResult, Sample};

/// Spaces between columns.
const PADDING: usize = 2;

pub struct TableWriter<'a> {
    out: Box<dyn Write + 'a>,
    options: Options,
}

impl<'a> TableWriter<'a> {
    pub fn new(out: Box<dyn Write + 'a>, options: Options) -> Self {
        Self { out, options }
    }

    fn write_rows(&mut self, header: Option<&[&str]>, rows: &[Vec<String>]) -> Result<()> {
        let header = header.filter(|_| !self.options.no_headers);
        let columns = header
            .map(<[&str]>::len)
            .into_iter()
            .chain(rows.iter().map(Vec::len))
            .max()
            .unwrap_or(0);

        let mut widths = vec![0; columns];
        for (i, cell) in header.into_iter().flatten().enumerate() {
            widths[i] = widths[i].max(cell.width());
        }
        for row in rows {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.width());
            }
        }

        if let Some(header) = header {
            let cells: Vec<String> = header.iter().map(|cell| cell.to_string()).collect();
            let line = pad_row(&cells, &widths);
            writeln!(self.out, "{}", style(line).bold())?;
        }
        for row in rows {
            writeln!(self.out, "{}", pad_row(row, &widths))?;
        }
        self.out.flush()?;
        Ok(())
    }
}

fn pad_row(cells: &[String], widths: &[usize]) -> String {
    let mut line = String::new();
    for (i, cell) in cells.iter().enumerate() {
        line.push_str(cell);
        if i + 1 < cells.len() {
            let fill = widths[i].saturating_sub(cell.width()) + PADDING;
            line.extend(std::iter::repeat(' ').take(fill));
        }
    }
    line
}

fn sample_rows(samples: &[Sample]) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    for sample in samples {
        let metric = format_metric(&sample.metric);
        for point in sample.value.iter().chain(&sample.values) {
            rows.push(vec![metric.clone(), format_value(point.value), format_time(&point.time())]);
        }
    }
    rows
}

impl Writer for TableWriter<'_> {
    fn write_query_result(&mut self, result: &QueryResult) -> Result<()> {
        const HEADER: &[&str] = &["METRIC", "VALUE", "TIMESTAMP"];
        match result {
            QueryResult::Vector(samples) | QueryResult::Matrix(samples) => {
                self.write_rows(Some(HEADER), &sample_rows(samples))
            }
            QueryResult::Scalar(value) => {
                let row = vec![format_value(value.value), format!("@{}", format_time(&value.time()))];
                self.write_rows(None, &[row])
            }
            QueryResult::String(value) => {
                let row = vec![value.value().to_string(), format!("@{}", format_time(&value.time()))];
                self.write_rows(None, &[row])
            }
        }
    }

    fn write_strings(&mut self, items: &[String]) -> Result<()> {
        for item in items {
            writeln!(self.out, "{item}")?;
        }
        self.out.flush()?;
        Ok(())
    }

    fn write_series(&mut self, series: &[LabelSet]) -> Result<()> {
        for labels in series {
            writeln!(self.out, "{}", format_metric(labels))?;
        }
        self.out.flush()?;
        Ok(())
    }
}
