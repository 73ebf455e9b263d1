//! vm-metrics: command-line client for the VictoriaMetrics HTTP API
//!
//! Instant and range queries, label and series discovery, and streaming
//! bulk import and export. Configuration is layered from defaults, a YAML
//! file, `VM_METRICS_*` environment variables and command-line flags.

pub mod api;
pub mod build_info;
pub mod cli;
pub mod config;
pub mod render;
pub mod utils;
