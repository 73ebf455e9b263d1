//! vm-metrics: command-line client for the VictoriaMetrics HTTP API

use anyhow::Result;

fn main() -> Result<()> {
    vm_metrics::cli::run()
}
