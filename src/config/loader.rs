//! Config file loading
//!
//! An explicitly requested file must exist and parse. Without one, a fixed
//! list of candidate paths is tried in order and the first readable,
//! parseable file wins; broken candidates are skipped with a warning and a
//! missing file is not an error.

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use super::error::ConfigError;
use super::overlay::{Overlay, Source};
use super::schema::ConfigSchema;

/// Candidate config files for `app_name`, highest priority first:
/// `./config.yaml`, `./config/config.yaml`, `~/.<app>.yaml`,
/// `/etc/<app>/config.yaml`.
pub fn default_search_paths(app_name: &str) -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("config.yaml"), Path::new("config").join("config.yaml")];
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(format!(".{app_name}.yaml")));
    }
    paths.push(Path::new("/etc").join(app_name).join("config.yaml"));
    paths
}

/// Load the file overlay.
///
/// Returns `Ok(None)` (an empty overlay) when no explicit path was given and
/// no candidate exists.
pub fn load_file(
    schema: &ConfigSchema,
    explicit: Option<&Path>,
    search_paths: &[PathBuf],
) -> Result<Option<Overlay>, ConfigError> {
    if let Some(path) = explicit {
        let overlay = read_overlay(schema, path)?;
        tracing::info!("Loaded config file {}", path.display());
        return Ok(Some(overlay));
    }

    for candidate in search_paths {
        if !candidate.is_file() {
            tracing::debug!("No config file at {}", candidate.display());
            continue;
        }
        match read_overlay(schema, candidate) {
            Ok(overlay) => {
                tracing::info!("Loaded config file {}", candidate.display());
                return Ok(Some(overlay));
            }
            Err(e) => {
                // Auto-discovered: warn and try the next candidate
                tracing::warn!(
                    "Failed to load auto-discovered config {}: {:#}",
                    candidate.display(),
                    anyhow::Error::from(e)
                );
            }
        }
    }

    tracing::debug!("No config file found, using defaults");
    Ok(None)
}

fn read_overlay(schema: &ConfigSchema, path: &Path) -> Result<Overlay, ConfigError> {
    let content = fs::read_to_string(path)
        .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
    parse_overlay(schema, &content, path)
}

/// Parse YAML `content` into an overlay attributed to `path`.
pub fn parse_overlay(
    schema: &ConfigSchema,
    content: &str,
    path: &Path,
) -> Result<Overlay, ConfigError> {
    let source = Source::File(path.to_path_buf());
    let blank = content.lines().map(str::trim).all(|line| line.is_empty() || line.starts_with('#'));
    if blank {
        return Ok(Overlay::new(source));
    }

    let document: Value = serde_yaml::from_str(content)
        .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;

    let tree = match document {
        Value::Null => return Ok(Overlay::new(source)),
        Value::Object(tree) => tree,
        _ => return Err(ConfigError::NotAMapping { path: path.to_path_buf() }),
    };

    let (entries, unknown) = schema.flatten(&tree);
    for key in unknown {
        tracing::warn!("Ignoring unknown key '{}' in config file {}", key, path.display());
    }
    Ok(Overlay::with_entries(source, entries))
}
