//! Configuration errors

use std::path::PathBuf;
use thiserror::Error;

use super::coerce::CoerceError;
use super::overlay::Source;
use super::schema::SchemaError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("config file {} must contain a mapping at the top level", .path.display())]
    NotAMapping { path: PathBuf },

    #[error("invalid value for '{key}' (from {origin})")]
    Coerce {
        key: String,
        origin: Source,
        #[source]
        source: CoerceError,
    },

    #[error("failed to build configuration")]
    Extract(#[source] Box<figment::Error>),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Extract(Box::new(err))
    }
}
