use std::path::PathBuf;
use thiserror::Error;

/// Error types for the HTTP client
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid server URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unsupported auth type '{0}' (use basic, bearer, or leave empty)")]
    UnsupportedAuth(String),

    #[error("failed to read {what} {}: {source}", .path.display())]
    TlsFile {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: HTTP {status} - {body}")]
    Status { status: u16, body: String },

    #[error("API error [{error_type}]: {message}")]
    Api { error_type: String, message: String },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
