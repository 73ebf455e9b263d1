//! Pretty-printed JSON output.

use anyhow::Result;
use serde::Serialize;
use std::io::Write;

use super::Writer;
use crate::api::{LabelSet, QueryResult};

pub struct JsonWriter<'a> {
    out: Box<dyn Write + 'a>,
}

impl<'a> JsonWriter<'a> {
    pub fn new(out: Box<dyn Write + 'a>) -> Self {
        Self { out }
    }

    fn write_json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.out, value)?;
        writeln!(self.out)?;
        self.out.flush()?;
        Ok(())
    }
}

impl Writer for JsonWriter<'_> {
    fn write_query_result(&mut self, result: &QueryResult) -> Result<()> {
        self.write_json(result)
    }

    fn write_strings(&mut self, items: &[String]) -> Result<()> {
        self.write_json(items)
    }

    fn write_series(&mut self, series: &[LabelSet]) -> Result<()> {
        self.write_json(series)
    }
}
