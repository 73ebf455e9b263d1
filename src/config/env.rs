//! Environment variable overlay
//!
//! Variables under the application prefix (`VM_METRICS_SERVER_URL`) map to
//! dot-path keys (`server.url`). Values stay raw strings; they are coerced
//! when the merger applies the overlay.
//!
//! `_` separates both words and sections in a variable name, so the suffix
//! is resolved through the schema's collapsed-key index first:
//! `VM_METRICS_SERVER_PATH_PREFIX` names `server.path_prefix`. Schemas are
//! rejected at build time when two keys collapse to the same suffix, so this
//! lookup is unambiguous. Suffixes the schema does not know fall back to the
//! plain `_` to `.` mapping.

use figment::providers::Env;
use serde_json::Value;

use super::overlay::{Overlay, Source};
use super::schema::ConfigSchema;

/// Derive the variable prefix from an application name: uppercased,
/// non-alphanumerics replaced with `_`, with a trailing `_`.
pub fn env_prefix(app_name: &str) -> String {
    let mut prefix: String = app_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    prefix.push('_');
    prefix
}

/// Scan the process environment for variables under `prefix`.
pub fn load_env(schema: &ConfigSchema, prefix: &str) -> Overlay {
    let env = Env::prefixed(prefix);
    let vars = env.iter().map(|(key, value)| (key.as_str().to_string(), value));
    overlay_from_suffixes(schema, vars)
}

/// Build the overlay from explicit `NAME=value` pairs (full variable names).
pub fn load_env_from<I, K, V>(schema: &ConfigSchema, prefix: &str, vars: I) -> Overlay
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    let suffixes = vars.into_iter().filter_map(|(name, value)| {
        let name = name.as_ref();
        let head = name.get(..prefix.len())?;
        head.eq_ignore_ascii_case(prefix)
            .then(|| (name[prefix.len()..].to_string(), value.into()))
    });
    overlay_from_suffixes(schema, suffixes)
}

fn overlay_from_suffixes(
    schema: &ConfigSchema,
    vars: impl Iterator<Item = (String, String)>,
) -> Overlay {
    let mut overlay = Overlay::new(Source::Env);
    for (suffix, value) in vars {
        let suffix = suffix.trim().to_ascii_lowercase();
        if suffix.is_empty() {
            continue;
        }
        let key = match schema.key_for_env_suffix(&suffix) {
            Some(key) => key.to_string(),
            None => {
                let key = suffix.replace('_', ".");
                tracing::debug!("Environment suffix '{}' matches no field, using key '{}'", suffix, key);
                key
            }
        };
        overlay.insert(key, Value::String(value));
    }
    overlay
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{Field, FieldKind, Section};
    use serde_json::json;

    fn schema() -> ConfigSchema {
        ConfigSchema::builder()
            .section(
                Section::new("server", "")
                    .field(Field::string("url", "", ""))
                    .field(Field::string("path_prefix", "", "")),
            )
            .section(Section::new("tls", "").field(Field::bool("skip_verify", false, "")))
            .section(Section::new("query", "").field(Field::new(
                "tags",
                FieldKind::StringList,
                json!([]),
                "",
            )))
            .build()
            .expect("schema")
    }

    #[test]
    fn test_env_prefix_from_app_name() {
        assert_eq!(env_prefix("vm-metrics"), "VM_METRICS_");
        assert_eq!(env_prefix("app.v2"), "APP_V2_");
    }

    #[test]
    fn test_maps_variables_to_dot_paths() {
        let overlay = load_env_from(
            &schema(),
            "VM_METRICS_",
            [
                ("VM_METRICS_SERVER_URL", "http://vm:8428"),
                ("VM_METRICS_SERVER_PATH_PREFIX", "/select/0"),
                ("VM_METRICS_TLS_SKIP_VERIFY", "true"),
                ("VM_METRICS_QUERY_TAGS", "a,b"),
                ("OTHER_SERVER_URL", "ignored"),
            ],
        );
        assert_eq!(overlay.len(), 4);
        assert_eq!(overlay.get("server.url"), Some(&json!("http://vm:8428")));
        assert_eq!(overlay.get("server.path_prefix"), Some(&json!("/select/0")));
        assert_eq!(overlay.get("tls.skip_verify"), Some(&json!("true")));
        assert_eq!(overlay.get("query.tags"), Some(&json!("a,b")));
        assert_eq!(overlay.source(), &Source::Env);
    }

    #[test]
    fn test_unknown_suffix_uses_plain_mapping() {
        let overlay = load_env_from(&schema(), "VM_METRICS_", [("VM_METRICS_SERVER_EXTRA_KEY", "1")]);
        assert_eq!(overlay.get("server.extra.key"), Some(&json!("1")));
    }

    #[test]
    fn test_bare_prefix_is_skipped() {
        let overlay = load_env_from(&schema(), "VM_METRICS_", [("VM_METRICS_", "x")]);
        assert!(overlay.is_empty());
    }

    #[test]
    #[serial_test::serial]
    fn test_reads_process_environment() {
        std::env::set_var("VMM_ENV_TEST_SERVER_URL", "http://from-env:8428");
        let overlay = load_env(&schema(), "VMM_ENV_TEST_");
        std::env::remove_var("VMM_ENV_TEST_SERVER_URL");
        assert_eq!(overlay.get("server.url"), Some(&json!("http://from-env:8428")));
    }
}
