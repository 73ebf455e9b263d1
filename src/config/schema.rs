//! Schema descriptor for layered configuration.
//!
//! A [`ConfigSchema`] is a tree of [`Section`]s holding [`Field`]s. Every
//! field carries its dot-path key, a [`FieldKind`] that drives coercion and
//! flag parsing, a default and a comment. The schema is built once, checked
//! for key collisions, and then walked by plain iteration: loaders, the flag
//! resolver, the merger and the template generator all read it.

use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use thiserror::Error;

use super::coerce::coerce;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("invalid key segment '{segment}' in '{path}': use lowercase letters, digits and '_'")]
    InvalidName { path: String, segment: String },

    #[error("duplicate configuration key '{0}'")]
    DuplicateKey(String),

    #[error(
        "keys '{first}' and '{second}' collide: both map to flag --{flag} and the same environment variable suffix"
    )]
    Collision { first: String, second: String, flag: String },

    #[error("invalid default for '{key}': {reason}")]
    InvalidDefault { key: String, reason: String },
}

/// Integer width for signed and unsigned field kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
}

/// Float width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatWidth {
    W32,
    W64,
}

/// Semantic type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Bool,
    Int(IntWidth),
    Uint(IntWidth),
    Float(FloatWidth),
    Duration,
    Timestamp,
    StringList,
    IntList,
    FloatList,
    StringMap,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::String => "string",
            FieldKind::Bool => "bool",
            FieldKind::Int(IntWidth::W8) => "i8",
            FieldKind::Int(IntWidth::W16) => "i16",
            FieldKind::Int(IntWidth::W32) => "i32",
            FieldKind::Int(IntWidth::W64) => "i64",
            FieldKind::Uint(IntWidth::W8) => "u8",
            FieldKind::Uint(IntWidth::W16) => "u16",
            FieldKind::Uint(IntWidth::W32) => "u32",
            FieldKind::Uint(IntWidth::W64) => "u64",
            FieldKind::Float(FloatWidth::W32) => "f32",
            FieldKind::Float(FloatWidth::W64) => "f64",
            FieldKind::Duration => "duration",
            FieldKind::Timestamp => "timestamp",
            FieldKind::StringList => "string list",
            FieldKind::IntList => "integer list",
            FieldKind::FloatList => "float list",
            FieldKind::StringMap => "string map",
        };
        f.write_str(name)
    }
}

/// A leaf configuration value.
#[derive(Debug, Clone)]
pub struct Field {
    name: &'static str,
    key: String,
    kind: FieldKind,
    default: Value,
    comment: &'static str,
    short: Option<char>,
}

impl Field {
    pub fn new(name: &'static str, kind: FieldKind, default: Value, comment: &'static str) -> Self {
        Self { name, key: name.to_string(), kind, default, comment, short: None }
    }

    pub fn string(name: &'static str, default: &str, comment: &'static str) -> Self {
        Self::new(name, FieldKind::String, Value::String(default.to_string()), comment)
    }

    pub fn bool(name: &'static str, default: bool, comment: &'static str) -> Self {
        Self::new(name, FieldKind::Bool, Value::Bool(default), comment)
    }

    pub fn duration(name: &'static str, default: &str, comment: &'static str) -> Self {
        Self::new(name, FieldKind::Duration, Value::String(default.to_string()), comment)
    }

    /// Attach a single-character flag alias.
    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    /// Dot-path key, e.g. `server.url`.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Default value in canonical (coerced) form.
    pub fn default_value(&self) -> &Value {
        &self.default
    }

    pub fn comment(&self) -> &str {
        self.comment
    }

    pub fn short_flag(&self) -> Option<char> {
        self.short
    }

    /// Long flag name: the dot-path with `.` and `_` replaced by `-`.
    pub fn flag_name(&self) -> String {
        self.key.replace(['.', '_'], "-")
    }

    /// Environment suffix: the dot-path with `.` and `_` collapsed to `_`,
    /// lowercased. Prefix it (uppercased) to get the variable name.
    pub fn env_suffix(&self) -> String {
        self.key.replace('.', "_")
    }
}

/// A named group of fields and nested sections.
#[derive(Debug, Clone)]
pub struct Section {
    name: &'static str,
    key: String,
    comment: &'static str,
    fields: Vec<Field>,
    sections: Vec<Section>,
}

impl Section {
    pub fn new(name: &'static str, comment: &'static str) -> Self {
        Self { name, key: name.to_string(), comment, fields: Vec::new(), sections: Vec::new() }
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn comment(&self) -> &str {
        self.comment
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    fn qualify(&mut self, prefix: &str) {
        self.key = join_key(prefix, self.name);
        for field in &mut self.fields {
            field.key = join_key(&self.key, field.name);
        }
        let key = self.key.clone();
        for section in &mut self.sections {
            section.qualify(&key);
        }
    }
}

/// Builder for [`ConfigSchema`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<Field>,
    sections: Vec<Section>,
}

impl SchemaBuilder {
    /// Add a top-level field.
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    /// Qualify keys, coerce defaults and reject collisions.
    pub fn build(self) -> Result<ConfigSchema, SchemaError> {
        let mut root = Section {
            name: "",
            key: String::new(),
            comment: "",
            fields: self.fields,
            sections: self.sections,
        };
        for field in &mut root.fields {
            field.key = field.name.to_string();
        }
        for section in &mut root.sections {
            section.qualify("");
        }

        let mut schema = ConfigSchema {
            root,
            fields: Vec::new(),
            index: HashMap::new(),
            env_index: HashMap::new(),
            section_keys: BTreeSet::new(),
        };
        schema.validate()?;
        Ok(schema)
    }
}

/// The full configuration shape. Constant once built.
#[derive(Debug, Clone)]
pub struct ConfigSchema {
    root: Section,
    /// Leaf fields, depth-first in declaration order.
    fields: Vec<Field>,
    /// dot-path -> position in `fields`
    index: HashMap<String, usize>,
    /// collapsed env suffix -> dot-path
    env_index: HashMap<String, String>,
    section_keys: BTreeSet<String>,
}

impl ConfigSchema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub fn root(&self) -> &Section {
        &self.root
    }

    /// All leaf fields, depth-first in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<&Field> {
        self.index.get(key).map(|&position| &self.fields[position])
    }

    pub fn is_section(&self, key: &str) -> bool {
        self.section_keys.contains(key)
    }

    /// Resolve a lowercased environment suffix (`server_path_prefix`) to the
    /// field key it names (`server.path_prefix`).
    pub fn key_for_env_suffix(&self, suffix: &str) -> Option<&str> {
        self.env_index.get(suffix).map(String::as_str)
    }

    /// Overlay of every field's default.
    pub fn defaults(&self) -> BTreeMap<String, Value> {
        self.fields
            .iter()
            .map(|field| (field.key().to_string(), field.default_value().clone()))
            .collect()
    }

    /// Flatten a nested document into dot-path entries.
    ///
    /// Descends only through schema sections; a field's value is taken whole
    /// even when it is a mapping (string maps). Keys with no schema
    /// counterpart are returned separately.
    pub fn flatten(&self, tree: &Map<String, Value>) -> (BTreeMap<String, Value>, Vec<String>) {
        let mut entries = BTreeMap::new();
        let mut unknown = Vec::new();
        self.flatten_into("", tree, &mut entries, &mut unknown);
        (entries, unknown)
    }

    fn flatten_into(
        &self,
        prefix: &str,
        tree: &Map<String, Value>,
        entries: &mut BTreeMap<String, Value>,
        unknown: &mut Vec<String>,
    ) {
        for (name, value) in tree {
            let key = join_key(prefix, name);
            if self.index.contains_key(&key) {
                entries.insert(key, value.clone());
            } else if self.is_section(&key) {
                match value {
                    Value::Object(child) => self.flatten_into(&key, child, entries, unknown),
                    Value::Null => {}
                    _ => unknown.push(key),
                }
            } else {
                unknown.push(key);
            }
        }
    }

    fn validate(&mut self) -> Result<(), SchemaError> {
        let mut sections = BTreeSet::new();
        collect_section_keys(&self.root, &mut sections);
        for key in &sections {
            check_segments(key)?;
        }

        let mut index = HashMap::new();
        let mut env_index: HashMap<String, String> = HashMap::new();
        let mut canonical_defaults = Vec::new();
        let mut leaves = Vec::new();
        collect_fields(&self.root, &mut leaves);

        for (position, field) in leaves.into_iter().enumerate() {
            check_segments(field.key())?;
            if index.insert(field.key().to_string(), position).is_some()
                || sections.contains(field.key())
            {
                return Err(SchemaError::DuplicateKey(field.key().to_string()));
            }

            let collapsed = field.env_suffix();
            if let Some(first) = env_index.insert(collapsed, field.key().to_string()) {
                return Err(SchemaError::Collision {
                    first,
                    second: field.key().to_string(),
                    flag: field.flag_name(),
                });
            }

            let default = coerce(field, field.default_value()).map_err(|err| {
                SchemaError::InvalidDefault { key: field.key().to_string(), reason: err.to_string() }
            })?;
            canonical_defaults.push(default);
        }

        let mut defaults = canonical_defaults.into_iter();
        apply_defaults(&mut self.root, &mut defaults);

        let mut leaves = Vec::new();
        collect_fields(&self.root, &mut leaves);
        self.fields = leaves.into_iter().cloned().collect();
        self.index = index;
        self.env_index = env_index;
        self.section_keys = sections;
        Ok(())
    }
}

fn collect_fields<'a>(section: &'a Section, out: &mut Vec<&'a Field>) {
    out.extend(section.fields.iter());
    for child in &section.sections {
        collect_fields(child, out);
    }
}

fn collect_section_keys(section: &Section, out: &mut BTreeSet<String>) {
    for child in &section.sections {
        out.insert(child.key.clone());
        collect_section_keys(child, out);
    }
}

fn apply_defaults(section: &mut Section, defaults: &mut impl Iterator<Item = Value>) {
    for field in &mut section.fields {
        if let Some(value) = defaults.next() {
            field.default = value;
        }
    }
    for child in &mut section.sections {
        apply_defaults(child, defaults);
    }
}

fn check_segments(path: &str) -> Result<(), SchemaError> {
    for segment in path.split('.') {
        let valid = !segment.is_empty()
            && !segment.starts_with('_')
            && !segment.ends_with('_')
            && segment.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if !valid {
            return Err(SchemaError::InvalidName {
                path: path.to_string(),
                segment: segment.to_string(),
            });
        }
    }
    Ok(())
}

pub(crate) fn join_key(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

/// Expand dot-path entries into a nested document.
pub fn unflatten(entries: &BTreeMap<String, Value>) -> Map<String, Value> {
    let mut root = Map::new();
    for (key, value) in entries {
        let mut node = &mut root;
        let mut segments = key.split('.').peekable();
        while let Some(segment) = segments.next() {
            if segments.peek().is_none() {
                node.insert(segment.to_string(), value.clone());
                break;
            }
            let child = node
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            node = match child {
                Value::Object(map) => map,
                _ => unreachable!("replaced with an object above"),
            };
        }
    }
    root
}
