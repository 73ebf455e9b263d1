//! Import command implementation

use anyhow::{bail, Context as _, Result};
use clap::{Args, Subcommand};
use std::path::PathBuf;
use tracing::info;

use super::utils::open_input;
use super::Context;
use crate::api::{ImportApi, ImportFormat, ImportOptions, VmClient};

#[derive(Args, Debug)]
#[command(args_conflicts_with_subcommands = true)]
pub struct ImportArgs {
    #[command(subcommand)]
    format: Option<ImportCommand>,

    #[command(flatten)]
    input: InputArgs,
}

#[derive(Subcommand, Debug)]
enum ImportCommand {
    /// JSON lines as written by `export json` (default)
    Json(InputArgs),

    Csv(InputArgs),

    /// VictoriaMetrics native binary format
    Native(InputArgs),

    /// Prometheus text exposition format
    Prometheus(PrometheusArgs),
}

#[derive(Args, Debug, Clone)]
struct InputArgs {
    /// File to read (default: stdin)
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// File to read, as an alternative to the positional argument
    #[arg(short, long, value_name = "FILE", conflicts_with = "file")]
    input: Option<PathBuf>,

    /// The input is gzip-compressed
    #[arg(long)]
    gzip: bool,
}

#[derive(Args, Debug, Clone)]
struct PrometheusArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Job label applied to every imported sample
    #[arg(long)]
    job: Option<String>,

    /// Instance label (requires --job)
    #[arg(long, requires = "job")]
    instance: Option<String>,
}

impl InputArgs {
    fn path(&self) -> Option<PathBuf> {
        self.input.clone().or_else(|| self.file.clone())
    }
}

fn resolve(args: ImportArgs) -> (ImportFormat, InputArgs, ImportOptions) {
    match args.format {
        None => (ImportFormat::Json, args.input, ImportOptions::default()),
        Some(ImportCommand::Json(input)) => (ImportFormat::Json, input, ImportOptions::default()),
        Some(ImportCommand::Csv(input)) => (ImportFormat::Csv, input, ImportOptions::default()),
        Some(ImportCommand::Native(input)) => (ImportFormat::Native, input, ImportOptions::default()),
        Some(ImportCommand::Prometheus(args)) => (
            ImportFormat::Prometheus,
            args.input,
            ImportOptions { job: args.job, instance: args.instance },
        ),
    }
}

pub fn run(args: ImportArgs, ctx: &Context) -> Result<()> {
    let (format, input, options) = resolve(args);
    let path = input.path();
    if path.is_none() && std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        bail!("no input: pass a FILE, --input, or pipe data on stdin");
    }

    let reader = open_input(path.as_deref(), input.gzip)?;
    let config = ctx.config()?;
    let client = VmClient::new(&config).context("failed to create API client")?;
    client.import(format, &options, reader).context("import failed")?;

    match path {
        Some(path) => info!("Imported {}", path.display()),
        None => info!("Imported stdin"),
    }
    Ok(())
}
