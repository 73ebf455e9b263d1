//! Application configuration: the schema and the typed [`Config`] it
//! resolves to.

use clap::ArgMatches;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::error::ConfigError;
use super::merge::{ConfigLoader, Merger, Resolution};
use super::schema::{ConfigSchema, Field, Section};
use super::template::render_template;
use crate::utils::time::serde_duration;

pub const APP_NAME: &str = "vm-metrics";

/// Mask shown in place of secrets by `config show`.
pub const SECRET_MASK: &str = "********";

pub static SCHEMA: Lazy<ConfigSchema> = Lazy::new(|| {
    ConfigSchema::builder()
        .section(
            Section::new("server", "VictoriaMetrics server connection")
                .field(Field::string("url", "http://localhost:8428", "VictoriaMetrics server URL"))
                .field(Field::string(
                    "path_prefix",
                    "",
                    "Path prefix for cluster or proxied setups (e.g. /select/0/prometheus)",
                ))
                .field(Field::duration("timeout", "30s", "Request timeout")),
        )
        .section(
            Section::new("auth", "Authentication")
                .field(Field::string("type", "", "Authentication type: basic, bearer, or empty for none"))
                .field(Field::string("user", "", "Username for basic auth"))
                .field(Field::string("password", "", "Password for basic auth"))
                .field(Field::string("token", "", "Token for bearer auth")),
        )
        .section(
            Section::new("tls", "TLS")
                .field(Field::string("ca", "", "CA certificate bundle (PEM)"))
                .field(Field::string("cert", "", "Client certificate (PEM)"))
                .field(Field::string("key", "", "Client private key (PEM)"))
                .field(Field::bool("skip_verify", false, "Skip server certificate verification")),
        )
        .section(
            Section::new("output", "Output")
                .field(Field::string("format", "table", "Output format: table, json, csv, graph").short('o'))
                .field(Field::bool("no_headers", false, "Omit table and CSV headers")),
        )
        .build()
        .expect("built-in configuration schema is valid")
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub tls: TlsConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub url: String,
    pub path_prefix: String,
    #[serde(with = "serde_duration")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub user: String,
    pub password: String,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TlsConfig {
    pub ca: String,
    pub cert: String,
    pub key: String,
    pub skip_verify: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub format: String,
    pub no_headers: bool,
}

impl Config {
    /// Resolve from the default sources: `config_file` (or the search
    /// paths), the process environment, then the command-line flags.
    pub fn load(
        config_file: Option<&Path>,
        flags: Option<&ArgMatches>,
    ) -> Result<Resolution<Config>, ConfigError> {
        ConfigLoader::new(&SCHEMA, APP_NAME).config_file(config_file).load(flags)
    }

    /// The all-defaults configuration.
    pub fn defaults() -> Result<Config, ConfigError> {
        Ok(Merger::new(&SCHEMA).finish::<Config>()?.config)
    }

    /// Copy with non-empty secrets replaced by [`SECRET_MASK`].
    pub fn redacted(&self) -> Config {
        let mut out = self.clone();
        for secret in [&mut out.auth.password, &mut out.auth.token] {
            if !secret.is_empty() {
                *secret = SECRET_MASK.to_string();
            }
        }
        out
    }
}

/// The documented config file for this application.
pub fn config_template() -> String {
    render_template(
        &SCHEMA,
        &[
            "vm-metrics configuration",
            "",
            "Searched in order: ./config.yaml, ./config/config.yaml, ~/.vm-metrics.yaml,",
            "/etc/vm-metrics/config.yaml. Every key can also be set with a VM_METRICS_*",
            "environment variable or a --<section>-<key> flag.",
        ],
    )
}
