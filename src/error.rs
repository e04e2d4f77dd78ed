// Crate-level errors
//
// Per-link download failures are not errors at this level; they are folded
// into `DownloadOutcome`. What remains is setup: config files, HTTP client
// construction, CLI I/O.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration value
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client could not be built (bad proxy URL, TLS backend)
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}
