//! Shared CLI utilities.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::utils::parse_time;

/// Destination for exported data, optionally gzip-compressed.
pub enum Output {
    Plain(Box<dyn Write>),
    Gzip(GzEncoder<Box<dyn Write>>),
}

impl Output {
    /// Open `path`, or stdout when absent or `-`.
    pub fn open(path: Option<&Path>, gzip: bool) -> Result<Self> {
        let inner: Box<dyn Write> = match path.filter(|p| *p != Path::new("-")) {
            Some(path) => {
                let file = File::create(path)
                    .with_context(|| format!("failed to create {}", path.display()))?;
                Box::new(BufWriter::new(file))
            }
            None => Box::new(io::stdout().lock()),
        };
        Ok(if gzip {
            Output::Gzip(GzEncoder::new(inner, Compression::default()))
        } else {
            Output::Plain(inner)
        })
    }

    /// Write the gzip trailer (if any) and flush.
    pub fn finish(self) -> io::Result<()> {
        match self {
            Output::Plain(mut out) => out.flush(),
            Output::Gzip(encoder) => encoder.finish()?.flush(),
        }
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Plain(out) => out.write(buf),
            Output::Gzip(out) => out.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Plain(out) => out.flush(),
            Output::Gzip(out) => out.flush(),
        }
    }
}

/// Open `path`, or stdin when absent or `-`, decompressing when `gzip`.
pub fn open_input(path: Option<&Path>, gzip: bool) -> Result<Box<dyn Read + Send>> {
    let inner: Box<dyn Read + Send> = match path.filter(|p| *p != Path::new("-")) {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(io::stdin()),
    };
    Ok(if gzip { Box::new(GzDecoder::new(inner)) } else { inner })
}

/// Parse an optional `--start`/`--end` style argument.
pub fn parse_time_arg(name: &str, value: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    match value {
        Some(value) => parse_time(value).with_context(|| format!("invalid --{name}")),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_gzip_output_round_trips_through_input() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.gz");

        let mut out = Output::open(Some(&path), true).unwrap();
        out.write_all(b"{\"metric\":{}}\n").unwrap();
        out.finish().unwrap();

        let mut text = String::new();
        open_input(Some(&path), true).unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "{\"metric\":{}}\n");
    }

    #[test]
    fn test_missing_input_names_path() {
        let err = open_input(Some(Path::new("/nonexistent/data.csv")), false).err().unwrap();
        assert!(err.to_string().contains("/nonexistent/data.csv"));
    }

    #[test]
    fn test_time_arg_echoes_input() {
        assert_eq!(parse_time_arg("start", None).unwrap(), None);
        assert!(parse_time_arg("start", Some("1700000000")).unwrap().is_some());
        let err = parse_time_arg("start", Some("yesterday-ish")).unwrap_err();
        assert!(format!("{err:#}").contains("yesterday-ish"));
    }
}
