//! Command-line interface for vm-metrics
//!
//! Provides `query`, `export`, `import`, `config`, `version` and
//! `completion`. Every configuration key is also exposed as a global flag
//! generated from the config schema.

use anyhow::{Context as _, Result};
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::build_info::BuildInfo;
use crate::config::{flag_args, leaf_matches, Config, Resolution, SCHEMA};

mod completion;
mod config;
mod export;
mod import;
mod query;
mod utils;
mod version;

/// Command-line client for the VictoriaMetrics HTTP API
#[derive(Parser)]
#[command(name = "vm-metrics")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: search ./config.yaml, ./config/config.yaml,
    /// ~/.vm-metrics.yaml, /etc/vm-metrics/config.yaml)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose logging (sets log level to DEBUG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an instant or range query, or list metrics, labels and series
    #[command(visible_alias = "q")]
    Query(query::QueryArgs),

    /// Export raw samples (JSON lines, CSV or native format)
    #[command(visible_alias = "e")]
    Export(export::ExportArgs),

    /// Import samples (JSON lines, CSV, native or Prometheus text format)
    #[command(visible_alias = "i")]
    Import(import::ImportArgs),

    /// Inspect configuration
    Config(config::ConfigArgs),

    /// Print version information
    Version(version::VersionArgs),

    /// Generate a shell completion script
    Completion(completion::CompletionArgs),
}

/// The full command tree, schema flags included.
pub fn command() -> clap::Command {
    Cli::command().args(flag_args(&SCHEMA))
}

/// Per-invocation state handed to the subcommands.
pub struct Context<'a> {
    config_file: Option<&'a Path>,
    flags: &'a ArgMatches,
}

impl Context<'_> {
    /// Resolve the configuration for this invocation.
    pub fn resolve(&self) -> Result<Resolution<Config>> {
        Config::load(self.config_file, Some(self.flags)).context("failed to load configuration")
    }

    pub fn config(&self) -> Result<Config> {
        Ok(self.resolve()?.config)
    }
}

pub fn run() -> Result<()> {
    let matches = command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    // Wire verbose flag to the tracing log level.
    // RUST_LOG in the environment always takes precedence; --verbose falls back to DEBUG.
    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    let build = BuildInfo::current();
    let ctx = Context { config_file: cli.config.as_deref(), flags: leaf_matches(&matches) };

    match cli.command {
        Commands::Query(args) => query::run(args, &ctx),
        Commands::Export(args) => export::run(args, &ctx),
        Commands::Import(args) => import::run(args, &ctx),
        Commands::Config(args) => config::run(args, &ctx),
        Commands::Version(args) => version::run(args, &build),
        Commands::Completion(args) => completion::run(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_tree_is_consistent() {
        command().debug_assert();
    }

    #[test]
    fn test_schema_flags_after_subcommand() {
        let matches = command()
            .try_get_matches_from(["vm-metrics", "query", "labels", "--server-url", "http://x:8428", "-o", "json"])
            .expect("parse");
        let overlay = crate::config::resolve_flags(&SCHEMA, leaf_matches(&matches));
        assert_eq!(overlay.get("server.url"), Some(&serde_json::json!("http://x:8428")));
        assert_eq!(overlay.get("output.format"), Some(&serde_json::json!("json")));
    }
}
