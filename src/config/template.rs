//! Config file template generated from the schema.
//!
//! Every field is written with its default and comment, sections nested the
//! way the file loader expects them. Values are rendered as JSON scalars and
//! flow collections, which YAML reads back unchanged, so loading the template
//! resolves to exactly the defaults.

use serde_json::Value;
use std::fmt::Write;

use super::schema::{ConfigSchema, Field, Section};

/// Render the template. `header` lines are emitted as leading comments.
pub fn render_template(schema: &ConfigSchema, header: &[&str]) -> String {
    let mut out = String::new();
    for line in header {
        push_comment(&mut out, 0, line);
    }
    if !header.is_empty() {
        out.push('\n');
    }

    let root = schema.root();
    for field in root.fields() {
        push_field(&mut out, 0, field);
    }
    for (i, section) in root.sections().iter().enumerate() {
        if i > 0 || !root.fields().is_empty() {
            out.push('\n');
        }
        push_section(&mut out, 0, section);
    }
    out
}

fn push_section(out: &mut String, depth: usize, section: &Section) {
    push_comment(out, depth, section.comment());
    let _ = writeln!(out, "{}{}:", indent(depth), section.name());
    for field in section.fields() {
        push_field(out, depth + 1, field);
    }
    for child in section.sections() {
        push_section(out, depth + 1, child);
    }
}

fn push_field(out: &mut String, depth: usize, field: &Field) {
    push_comment(out, depth, field.comment());
    let _ = writeln!(out, "{}{}: {}", indent(depth), field.name(), yaml_value(field.default_value()));
}

/// JSON text with a space after every flow separator.
fn yaml_value(value: &Value) -> String {
    match value {
        Value::Array(items) => {
            let items: Vec<_> = items.iter().map(yaml_value).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(entries) => {
            let entries: Vec<_> = entries
                .iter()
                .map(|(key, value)| format!("{}: {}", Value::String(key.clone()), yaml_value(value)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
        scalar => scalar.to_string(),
    }
}

fn push_comment(out: &mut String, depth: usize, comment: &str) {
    for line in comment.lines().filter(|line| !line.trim().is_empty()) {
        let _ = writeln!(out, "{}# {}", indent(depth), line.trim_end());
    }
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}
