//! Completion command implementation

use anyhow::Result;
use clap::Args;
use clap_complete::{generate, Shell};
use std::io;

use crate::config::APP_NAME;

#[derive(Args, Debug)]
pub struct CompletionArgs {
    /// Shell to generate the script for
    #[arg(value_enum)]
    shell: Shell,
}

pub fn run(args: CompletionArgs) -> Result<()> {
    generate(args.shell, &mut super::command(), APP_NAME, &mut io::stdout());
    Ok(())
}
