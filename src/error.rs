// Error types shared by the library modules. The binary and the
// interactive UI wrap these in `anyhow` at their boundary; everything
// below the UI returns `UploaderResult`.

use std::path::PathBuf;
use thiserror::Error;

pub type UploaderResult<T> = Result<T, UploaderError>;

#[derive(Debug, Error)]
pub enum UploaderError {
    /// The directory itself could not be read. Distinct from "empty".
    #[error("access denied: {}", .0.display())]
    AccessDenied(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("missing file: {0}")]
    MissingFile(String),

    #[error("file too large: {name} ({size} bytes, limit {limit})")]
    SizeLimit { name: String, size: u64, limit: u64 },

    #[error("not a video: {0}")]
    NotAVideo(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("invalid input: {0}")]
    Input(String),

    #[error("no entry numbered {index} (valid: {first}-{last})")]
    IndexOutOfRange {
        index: usize,
        first: usize,
        last: usize,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("no files selected")]
    EmptySelection,

    #[error("no destination chosen")]
    NoDestination,

    #[error("upload is {actual}, expected {expected}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("credential error: {0}")]
    Credential(String),
}

/// Failures reported by a `Transport` implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network-level failure (timeout, refused, disconnected). The request
    /// URL is stripped because it carries the bot token.
    #[error("transport failed: {0}")]
    Http(reqwest::Error),

    /// The API answered with `ok: false`.
    #[error("rejected by API ({code}): {description}")]
    Api { code: i64, description: String },

    #[error("API response had no result")]
    MissingResult,
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::Http(err.without_url())
    }
}
