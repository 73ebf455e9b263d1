//! Overlays: flat dot-path snapshots produced by one configuration source.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use super::schema::ConfigSchema;

/// Where an overlay (and therefore a resolved value) came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Default,
    File(PathBuf),
    Env,
    Flag,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Default => f.write_str("default"),
            Source::File(path) => write!(f, "file:{}", path.display()),
            Source::Env => f.write_str("env"),
            Source::Flag => f.write_str("flag"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    source: Source,
    entries: BTreeMap<String, Value>,
}

impl Overlay {
    pub fn new(source: Source) -> Self {
        Self { source, entries: BTreeMap::new() }
    }

    pub fn with_entries(source: Source, entries: BTreeMap<String, Value>) -> Self {
        Self { source, entries }
    }

    /// Default loader: every field's default at its dot-path.
    pub fn defaults(schema: &ConfigSchema) -> Self {
        Self::with_entries(Source::Default, schema.defaults())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    /// Path of the file this overlay was read from, if any.
    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            Source::File(path) => Some(path),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }
}
