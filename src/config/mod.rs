//! Configuration loading and merging
//!
//! Handles loading from defaults, a YAML config file, environment variables
//! and CLI flags with proper precedence (Flag > Env > File > Default). The
//! shape of the configuration lives in one [`ConfigSchema`]; every loader,
//! the flag generator and the template walk it instead of carrying
//! per-field code.

pub mod coerce;
pub mod env;
pub mod error;
pub mod flags;
pub mod loader;
pub mod merge;
pub mod overlay;
pub mod schema;
pub mod settings;
pub mod template;

pub use error::ConfigError;
pub use flags::{flag_args, leaf_matches, resolve_flags};
pub use loader::{default_search_paths, load_file};
pub use merge::{ConfigLoader, Merger, Resolution};
pub use overlay::{Overlay, Source};
pub use schema::{ConfigSchema, Field, FieldKind, Section};
pub use settings::{config_template, Config, APP_NAME, SCHEMA, SECRET_MASK};
