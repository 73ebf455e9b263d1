//! ASCII line charts for range query results.
//!
//! Only matrix results are charted, one chart per series; everything else
//! is written as a table.

use anyhow::Result;
use std::io::Write;
use unicode_width::UnicodeWidthStr;

use super::table::TableWriter;
use super::{Options, Writer};
use crate::api::{format_metric, LabelSet, QueryResult};

pub const HEIGHT: usize = 10;
pub const WIDTH: usize = 60;

pub struct GraphWriter<'a> {
    out: Box<dyn Write + 'a>,
    options: Options,
}

impl<'a> GraphWriter<'a> {
    pub fn new(out: Box<dyn Write + 'a>, options: Options) -> Self {
        Self { out, options }
    }

    fn table(&mut self) -> TableWriter<'_> {
        TableWriter::new(Box::new(&mut self.out), self.options)
    }
}

impl Writer for GraphWriter<'_> {
    fn write_query_result(&mut self, result: &QueryResult) -> Result<()> {
        let series = match result {
            QueryResult::Matrix(series) if !series.is_empty() => series,
            _ => return self.table().write_query_result(result),
        };

        for sample in series {
            let data: Vec<f64> = sample.values.iter().map(|point| point.value).collect();
            let chart = plot(&data, HEIGHT, WIDTH);
            if chart.is_empty() {
                continue;
            }
            writeln!(self.out, "{chart}")?;
            writeln!(self.out, "{}", caption(&chart, &format_metric(&sample.metric)))?;
            writeln!(self.out)?;
        }
        self.out.flush()?;
        Ok(())
    }

    fn write_strings(&mut self, items: &[String]) -> Result<()> {
        self.table().write_strings(items)
    }

    fn write_series(&mut self, series: &[LabelSet]) -> Result<()> {
        self.table().write_series(series)
    }
}

/// Plot `data` as a line chart `height` rows tall and at most `width`
/// columns wide, with a value axis on the left. Non-finite values are
/// dropped; returns an empty string when nothing is left to draw.
pub fn plot(data: &[f64], height: usize, width: usize) -> String {
    let finite: Vec<f64> = data.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() || height == 0 || width == 0 {
        return String::new();
    }
    let series = if finite.len() > width { resample(&finite, width) } else { finite };

    let min = series.iter().copied().fold(f64::INFINITY, f64::min);
    let max = series.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;
    let levels: Vec<usize> = series
        .iter()
        .map(|v| if span == 0.0 { 0 } else { ((v - min) / span * height as f64).round() as usize })
        .collect();

    let mut grid = vec![vec![' '; levels.len()]; height + 1];
    for (x, &y0) in levels.iter().enumerate() {
        let y1 = levels.get(x + 1).copied().unwrap_or(y0);
        if y0 == y1 {
            grid[height - y0][x] = '─';
            continue;
        }
        let (low, high) = (y0.min(y1), y0.max(y1));
        if y0 > y1 {
            grid[height - y1][x] = '╰';
            grid[height - y0][x] = '╮';
        } else {
            grid[height - y1][x] = '╭';
            grid[height - y0][x] = '╯';
        }
        for y in low + 1..high {
            grid[height - y][x] = '│';
        }
    }

    let labels: Vec<String> = (0..=height)
        .map(|row| {
            let value = if span == 0.0 { max } else { max - span * row as f64 / height as f64 };
            format!("{value:.2}")
        })
        .collect();
    let label_width = labels.iter().map(|l| l.width()).max().unwrap_or(0);

    grid.iter()
        .zip(&labels)
        .map(|(row, label)| {
            let line: String = row.iter().collect();
            format!("{label:>label_width$} ┤{line}").trim_end().to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Linear interpolation of `data` onto `width` evenly spaced points.
fn resample(data: &[f64], width: usize) -> Vec<f64> {
    if width == 1 {
        return vec![data[0]];
    }
    let last = (data.len() - 1) as f64;
    (0..width)
        .map(|i| {
            let pos = i as f64 * last / (width - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            let frac = pos - lo as f64;
            data[lo] + (data[hi] - data[lo]) * frac
        })
        .collect()
}

/// Center `text` under the plotted area of `chart`.
fn caption(chart: &str, text: &str) -> String {
    let axis = chart.lines().next().and_then(|line| line.find('┤')).unwrap_or(0);
    let offset = chart[..axis].width() + 1;
    let plotted = chart.lines().map(|line| line.width()).max().unwrap_or(0).saturating_sub(offset);
    let pad = offset + plotted.saturating_sub(text.width()) / 2;
    format!("{}{}", " ".repeat(pad), text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Sample, SampleValue};

    #[test]
    fn test_plot_rising_line() {
        let chart = plot(&[1.0, 2.0, 3.0], 2, WIDTH);
        assert_eq!(chart, "3.00 ┤ ╭─\n2.00 ┤╭╯\n1.00 ┤╯");
    }

    #[test]
    fn test_plot_falling_with_vertical_run() {
        let chart = plot(&[4.0, 0.0], 4, WIDTH);
        let lines: Vec<_> = chart.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].ends_with("┤╮"));
        assert!(lines[2].ends_with("┤│"));
        assert!(lines[4].ends_with("┤╰─"));
    }

    #[test]
    fn test_plot_flat_and_empty() {
        assert_eq!(plot(&[5.0, 5.0], 2, WIDTH).lines().last(), Some("5.00 ┤──"));
        assert_eq!(plot(&[f64::NAN], 2, WIDTH), "");
        assert_eq!(plot(&[], 2, WIDTH), "");
    }

    #[test]
    fn test_resample_keeps_endpoints() {
        let data: Vec<f64> = (0..=100).map(f64::from).collect();
        let out = resample(&data, 11);
        assert_eq!(out.len(), 11);
        assert_eq!(out[0], 0.0);
        assert_eq!(out[5], 50.0);
        assert_eq!(out[10], 100.0);
    }

    #[test]
    fn test_non_matrix_falls_back_to_table() {
        let mut buf = Vec::new();
        GraphWriter::new(Box::new(&mut buf), Options { no_headers: true })
            .write_query_result(&QueryResult::Scalar(SampleValue { timestamp: 0.0, value: 1.0 }))
            .unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "1  @1970-01-01T00:00:00Z\n");
    }

    #[test]
    fn test_matrix_chart_has_caption() {
        let mut metric = LabelSet::new();
        metric.insert("__name__".into(), "up".into());
        let values = [1.0, 3.0, 2.0]
            .iter()
            .enumerate()
            .map(|(i, &value)| SampleValue { timestamp: i as f64, value })
            .collect();
        let result = QueryResult::Matrix(vec![Sample { metric, value: None, values }]);

        let mut buf = Vec::new();
        GraphWriter::new(Box::new(&mut buf), Options::default()).write_query_result(&result).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().filter(|l| l.contains('┤')).count(), HEIGHT + 1);
        assert!(text.lines().any(|l| l.trim() == "up"));
    }
}
