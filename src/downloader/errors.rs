// Error types for a single downloader or prober invocation

use std::time::Duration;

use thiserror::Error;

/// Why one tool invocation failed.
///
/// These never escape a batch: the scheduler folds them into the link's
/// `DownloadOutcome`, so the `Display` text is what the user ends up reading.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DownloadError {
    /// The external binary could not be resolved (not installed / not on PATH)
    #[error("{0} not found: install it or point the config at its binary")]
    ToolNotFound(String),

    /// The invocation ran past its per-item timeout and was killed
    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The batch was cancelled while this invocation was queued or running
    #[error("cancelled")]
    Cancelled,

    /// The tool ran and exited unsuccessfully; carries stderr or the exit code
    #[error("{0}")]
    Failed(String),

    /// The process could not be started or waited on
    #[error("failed to run {program}: {message}")]
    Spawn { program: String, message: String },

    /// Tool output was not in the expected format
    #[error("{0}")]
    ParseError(String),
}

impl DownloadError {
    pub fn spawn(program: &str, err: impl std::fmt::Display) -> Self {
        Self::Spawn {
            program: program.to_string(),
            message: err.to_string(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
