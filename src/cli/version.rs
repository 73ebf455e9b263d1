//! Version command implementation

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::build_info::BuildInfo;

#[derive(Args, Debug)]
pub struct VersionArgs {
    #[command(subcommand)]
    format: Option<VersionFormat>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum VersionFormat {
    /// Only the version number
    Short,

    /// The build record as JSON
    Json,
}

pub fn run(args: VersionArgs, build: &BuildInfo) -> Result<()> {
    println!("{}", render(args.format, build)?);
    Ok(())
}

fn render(format: Option<VersionFormat>, build: &BuildInfo) -> Result<String> {
    Ok(match format {
        None => build.to_string(),
        Some(VersionFormat::Short) => build.short().to_string(),
        Some(VersionFormat::Json) => serde_json::to_string_pretty(build)?,
    })
}
