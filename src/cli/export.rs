//! Export command implementation

use anyhow::{bail, Context as _, Result};
use clap::{Args, Subcommand};
use std::path::PathBuf;
use tracing::info;

use super::utils::{parse_time_arg, Output};
use super::Context;
use crate::api::{ExportApi, ExportFormat, ExportOptions, VmClient, DEFAULT_CSV_FORMAT};

#[derive(Args, Debug)]
#[command(args_conflicts_with_subcommands = true)]
pub struct ExportArgs {
    #[command(subcommand)]
    format: Option<ExportCommand>,

    #[command(flatten)]
    json: JsonArgs,
}

#[derive(Subcommand, Debug)]
enum ExportCommand {
    /// JSON lines, one series per line (default)
    Json(JsonArgs),

    /// CSV with a configurable column layout
    Csv(CsvArgs),

    /// VictoriaMetrics native binary format
    Native(CommonArgs),
}

#[derive(Args, Debug, Clone)]
struct CommonArgs {
    /// Series selectors, e.g. 'up' or '{job="node"}'
    #[arg(value_name = "MATCH")]
    matches: Vec<String>,

    /// Start of the time range: RFC3339, Unix seconds or "now"
    #[arg(long, value_name = "TIME")]
    start: Option<String>,

    /// End of the time range
    #[arg(long, value_name = "TIME")]
    end: Option<String>,

    /// Write to FILE instead of stdout ("-" is stdout)
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Gzip-compress the output
    #[arg(long)]
    gzip: bool,
}

#[derive(Args, Debug, Clone)]
struct JsonArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Split long series into lines of at most this many samples (0 = server default)
    #[arg(long, default_value_t = 0, value_name = "N")]
    max_rows_per_line: usize,
}

#[derive(Args, Debug, Clone)]
struct CsvArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Column layout
    #[arg(long, default_value = DEFAULT_CSV_FORMAT, value_name = "FORMAT")]
    csv_format: String,

    /// Skip deduplication on the server to reduce memory usage
    #[arg(long)]
    reduce_mem_usage: bool,
}

/// Everything needed to run one export.
#[derive(Debug)]
struct ExportJob {
    format: ExportFormat,
    options: ExportOptions,
    output: Option<PathBuf>,
    gzip: bool,
}

impl ExportJob {
    fn from_args(args: ExportArgs) -> Result<Self> {
        let (format, common, max_rows_per_line, csv_format, reduce_mem_usage) = match args.format {
            None => (ExportFormat::Json, args.json.common, args.json.max_rows_per_line, String::new(), false),
            Some(ExportCommand::Json(json)) => {
                (ExportFormat::Json, json.common, json.max_rows_per_line, String::new(), false)
            }
            Some(ExportCommand::Csv(csv)) => {
                (ExportFormat::Csv, csv.common, 0, csv.csv_format, csv.reduce_mem_usage)
            }
            Some(ExportCommand::Native(common)) => (ExportFormat::Native, common, 0, String::new(), false),
        };

        if common.matches.is_empty() {
            bail!("at least one match selector is required");
        }

        let options = ExportOptions {
            start: parse_time_arg("start", common.start.as_deref())?,
            end: parse_time_arg("end", common.end.as_deref())?,
            matches: common.matches,
            max_rows_per_line,
            csv_format,
            reduce_mem_usage,
        };
        Ok(Self { format, options, output: common.output, gzip: common.gzip })
    }
}

pub fn run(args: ExportArgs, ctx: &Context) -> Result<()> {
    let job = ExportJob::from_args(args)?;
    let config = ctx.config()?;
    let client = VmClient::new(&config).context("failed to create API client")?;

    let mut out = Output::open(job.output.as_deref(), job.gzip)?;
    let written = client.export(job.format, &job.options, &mut out).context("export failed")?;
    out.finish().context("failed to finish writing export")?;

    if let Some(path) = &job.output {
        info!("Exported {} bytes to {}", written, path.display());
    }
    Ok(())
}
