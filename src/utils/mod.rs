//! Shared helpers

pub mod time;

pub use time::{format_duration, format_unix_seconds, parse_duration, parse_time, TimeError};
