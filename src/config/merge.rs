//! Merging overlays into the resolved configuration
//!
//! Overlays are applied Default → File → Env → Flag onto a flat dot-path
//! store. Each applied value replaces whatever the key held before, so a
//! list or map from a later source replaces an earlier one whole. Values
//! are coerced to their field kind as they are applied; the finished store
//! is expanded into a nested document and extracted into the typed config.

use clap::ArgMatches;
use figment::providers::Serialized;
use figment::Figment;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::coerce::coerce;
use super::env::{load_env, load_env_from};
use super::error::ConfigError;
use super::flags::resolve_flags;
use super::loader::{default_search_paths, load_file};
use super::overlay::{Overlay, Source};
use super::schema::{unflatten, ConfigSchema};

/// The outcome of a resolution: the typed config plus where each value came
/// from.
#[derive(Debug, Clone)]
pub struct Resolution<T> {
    pub config: T,
    /// Winning source per dot-path key.
    pub origins: BTreeMap<String, Source>,
    /// The config file that was loaded, if any.
    pub file: Option<PathBuf>,
}

/// Flat merge store.
#[derive(Debug)]
pub struct Merger<'a> {
    schema: &'a ConfigSchema,
    values: BTreeMap<String, Value>,
    origins: BTreeMap<String, Source>,
    file: Option<PathBuf>,
}

impl<'a> Merger<'a> {
    /// Start from the default overlay.
    pub fn new(schema: &'a ConfigSchema) -> Self {
        let defaults = Overlay::defaults(schema);
        let origins = defaults.iter().map(|(key, _)| (key.clone(), Source::Default)).collect();
        let values = defaults.iter().map(|(key, value)| (key.clone(), value.clone())).collect();
        Self { schema, values, origins, file: None }
    }

    /// Apply one overlay on top of everything applied so far.
    pub fn apply(&mut self, overlay: &Overlay) -> Result<(), ConfigError> {
        if let Some(path) = overlay.path() {
            self.file = Some(path.to_path_buf());
        }
        for (key, raw) in overlay.iter() {
            let Some(field) = self.schema.field(key) else {
                tracing::debug!("Ignoring '{}' from {}: no such configuration key", key, overlay.source());
                continue;
            };
            let value = coerce(field, raw).map_err(|source| ConfigError::Coerce {
                key: key.clone(),
                origin: overlay.source().clone(),
                source,
            })?;
            tracing::debug!("{} = {} (from {})", key, value, overlay.source());
            self.values.insert(key.clone(), value);
            self.origins.insert(key.clone(), overlay.source().clone());
        }
        Ok(())
    }

    /// Current merged value of `key`.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Expand the store and extract the typed configuration.
    pub fn finish<T: DeserializeOwned>(self) -> Result<Resolution<T>, ConfigError> {
        let document = Value::Object(unflatten(&self.values));
        let config = Figment::from(Serialized::defaults(document)).extract::<T>()?;
        Ok(Resolution { config, origins: self.origins, file: self.file })
    }
}

enum EnvSource {
    Process,
    Vars(Vec<(String, String)>),
}

/// Runs the loaders and the merger for one invocation.
pub struct ConfigLoader<'a> {
    schema: &'a ConfigSchema,
    config_file: Option<PathBuf>,
    search_paths: Vec<PathBuf>,
    env_prefix: String,
    env: EnvSource,
}

impl<'a> ConfigLoader<'a> {
    /// Loader for `app_name`: default search paths and the process
    /// environment under the derived prefix.
    pub fn new(schema: &'a ConfigSchema, app_name: &str) -> Self {
        Self {
            schema,
            config_file: None,
            search_paths: default_search_paths(app_name),
            env_prefix: super::env::env_prefix(app_name),
            env: EnvSource::Process,
        }
    }

    /// Explicit config file; failure to read or parse it is fatal.
    pub fn config_file(mut self, path: Option<&Path>) -> Self {
        self.config_file = path.map(Path::to_path_buf);
        self
    }

    pub fn search_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.search_paths = paths;
        self
    }

    /// Use these variables instead of the process environment.
    pub fn env_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env = EnvSource::Vars(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    /// Resolve the configuration. `flags` are the (leaf) matches of the
    /// invoking command line, if any.
    pub fn load<T: DeserializeOwned>(
        &self,
        flags: Option<&ArgMatches>,
    ) -> Result<Resolution<T>, ConfigError> {
        let mut merger = Merger::new(self.schema);

        if let Some(file) = load_file(self.schema, self.config_file.as_deref(), &self.search_paths)? {
            merger.apply(&file)?;
        }

        let env = match &self.env {
            EnvSource::Process => load_env(self.schema, &self.env_prefix),
            EnvSource::Vars(vars) => load_env_from(self.schema, &self.env_prefix, vars.iter().cloned()),
        };
        merger.apply(&env)?;

        if let Some(matches) = flags {
            merger.apply(&resolve_flags(self.schema, matches))?;
        }

        merger.finish()
    }
}
