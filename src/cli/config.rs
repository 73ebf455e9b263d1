//! Config command implementation

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use std::fmt::Write as _;

use super::Context;
use crate::config::{config_template, Config, Resolution};

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print a documented config file with every default
    Template,

    /// Print the resolved configuration (secrets masked)
    Show {
        /// Also list which source set each key
        #[arg(long)]
        origins: bool,
    },
}

pub fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Template => print!("{}", config_template()),
        ConfigCommand::Show { origins } => print!("{}", show(&ctx.resolve()?, origins)?),
    }
    Ok(())
}

/// YAML for the resolved config, followed by an origins comment block when
/// asked for.
fn show(resolution: &Resolution<Config>, origins: bool) -> Result<String> {
    let mut out = String::new();
    if let Some(path) = &resolution.file {
        writeln!(out, "# loaded from {}", path.display())?;
    }
    out.push_str(
        &serde_yaml::to_string(&resolution.config.redacted()).context("failed to serialize config")?,
    );
    if origins {
        writeln!(out, "# origins:")?;
        let width = resolution.origins.keys().map(String::len).max().unwrap_or(0);
        for (key, source) in &resolution.origins {
            writeln!(out, "#   {key:<width$}  {source}")?;
        }
    }
    Ok(out)
}
