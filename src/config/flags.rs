//! Command-line flags generated from the schema, and the flag overlay.
//!
//! [`flag_args`] turns every field into a global `--<flag-name>` argument
//! whose value parser matches the field kind. [`resolve_flags`] reads back
//! only the flags the user actually typed: a flag that was not given leaves
//! the key to the lower-priority sources.

use chrono::{DateTime, Utc};
use clap::builder::BoolishValueParser;
use clap::parser::{MatchesError, ValueSource};
use clap::{value_parser, Arg, ArgAction, ArgMatches};
use serde_json::{Map, Number, Value};
use std::time::Duration;

use super::coerce::{int_bounds, parse_pair, uint_bound};
use super::overlay::{Overlay, Source};
use super::schema::{ConfigSchema, Field, FieldKind};
use crate::utils::time::{format_duration, parse_duration, parse_time, TimeError};

/// Help heading the generated flags are grouped under.
pub const FLAG_HEADING: &str = "Configuration overrides";

/// One global argument per schema field.
pub fn flag_args(schema: &ConfigSchema) -> Vec<Arg> {
    schema.fields().into_iter().map(flag_arg).collect()
}

fn flag_arg(field: &Field) -> Arg {
    let name = field.flag_name();
    let mut arg = Arg::new(name.clone())
        .long(name)
        .help(field.comment().to_string())
        .help_heading(FLAG_HEADING)
        .global(true);
    if let Some(short) = field.short_flag() {
        arg = arg.short(short);
    }

    match field.kind() {
        FieldKind::String => arg.value_name("STRING").value_parser(value_parser!(String)),
        FieldKind::Bool => arg
            .value_name("BOOL")
            .value_parser(BoolishValueParser::new())
            .num_args(0..=1)
            .require_equals(true)
            .default_missing_value("true"),
        FieldKind::Int(width) => {
            let (min, max) = int_bounds(width);
            arg.value_name("INT").value_parser(value_parser!(i64).range(min..=max))
        }
        FieldKind::Uint(width) => {
            arg.value_name("UINT").value_parser(value_parser!(u64).range(0..=uint_bound(width)))
        }
        FieldKind::Float(_) => arg.value_name("FLOAT").value_parser(parse_finite_f64),
        FieldKind::Duration => arg.value_name("DURATION").value_parser(parse_duration),
        FieldKind::Timestamp => arg.value_name("TIME").value_parser(parse_timestamp),
        FieldKind::StringList => list(arg, "STRING").value_parser(value_parser!(String)),
        FieldKind::IntList => list(arg, "INT").value_parser(value_parser!(i64)),
        FieldKind::FloatList => list(arg, "FLOAT").value_parser(parse_finite_f64),
        FieldKind::StringMap => list(arg, "KEY=VALUE").value_parser(parse_map_entry),
    }
}

fn list(arg: Arg, value_name: &'static str) -> Arg {
    arg.value_name(value_name).action(ArgAction::Append).value_delimiter(',')
}

/// JSON has no NaN or infinity, so those are rejected at parse time.
fn parse_finite_f64(input: &str) -> Result<f64, String> {
    match input.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        Ok(_) => Err(format!("'{input}' is not a finite number")),
        Err(err) => Err(format!("'{input}': {err}")),
    }
}

fn parse_timestamp(input: &str) -> Result<DateTime<Utc>, TimeError> {
    parse_time(input)?.ok_or_else(|| TimeError::InvalidTime(input.to_string()))
}

fn parse_map_entry(input: &str) -> Result<(String, String), String> {
    parse_pair(input)
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{input}'"))
}

/// Follow subcommand matches down to the innermost one.
///
/// Global flags typed anywhere on the command line are visible there.
pub fn leaf_matches(matches: &ArgMatches) -> &ArgMatches {
    let mut current = matches;
    while let Some((_, sub)) = current.subcommand() {
        current = sub;
    }
    current
}

/// Build the flag overlay from parsed arguments.
pub fn resolve_flags(schema: &ConfigSchema, matches: &ArgMatches) -> Overlay {
    let mut overlay = Overlay::new(Source::Flag);
    for field in schema.fields() {
        let id = field.flag_name();
        if !explicitly_set(matches, &id) {
            continue;
        }
        match read_flag(field, matches, &id) {
            Ok(Some(value)) => {
                tracing::debug!("Flag --{} sets {}", id, field.key());
                overlay.insert(field.key(), value);
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!("Skipping flag --{} ({}): {}", id, field.kind(), err);
            }
        }
    }
    overlay
}

fn explicitly_set(matches: &ArgMatches, id: &str) -> bool {
    matches!(matches.try_contains_id(id), Ok(true))
        && matches.value_source(id) == Some(ValueSource::CommandLine)
}

fn read_flag(field: &Field, m: &ArgMatches, id: &str) -> Result<Option<Value>, MatchesError> {
    let value = match field.kind() {
        FieldKind::String => m.try_get_one::<String>(id)?.map(|s| Value::String(s.clone())),
        FieldKind::Bool => m.try_get_one::<bool>(id)?.map(|b| Value::Bool(*b)),
        FieldKind::Int(_) => m.try_get_one::<i64>(id)?.map(|n| Value::from(*n)),
        FieldKind::Uint(_) => m.try_get_one::<u64>(id)?.map(|n| Value::from(*n)),
        FieldKind::Float(_) => {
            m.try_get_one::<f64>(id)?.and_then(|f| Number::from_f64(*f)).map(Value::Number)
        }
        FieldKind::Duration => {
            m.try_get_one::<Duration>(id)?.map(|d| Value::String(format_duration(*d)))
        }
        FieldKind::Timestamp => {
            m.try_get_one::<DateTime<Utc>>(id)?.map(|ts| Value::String(ts.to_rfc3339()))
        }
        FieldKind::StringList => m
            .try_get_many::<String>(id)?
            .map(|values| Value::Array(values.map(|s| Value::String(s.clone())).collect())),
        FieldKind::IntList => m
            .try_get_many::<i64>(id)?
            .map(|values| Value::Array(values.map(|n| Value::from(*n)).collect())),
        FieldKind::FloatList => m.try_get_many::<f64>(id)?.and_then(|values| {
            values.map(|f| Number::from_f64(*f).map(Value::Number)).collect::<Option<_>>()
        }).map(Value::Array),
        FieldKind::StringMap => m.try_get_many::<(String, String)>(id)?.map(|entries| {
            let map: Map<String, Value> =
                entries.map(|(k, v)| (k.clone(), Value::String(v.clone()))).collect();
            Value::Object(map)
        }),
    };
    Ok(value)
}
