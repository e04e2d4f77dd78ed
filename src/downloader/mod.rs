// Downloader module - tool backends, routing, probing and shared models

pub mod backends;
pub mod diagnostics;
pub mod errors;
pub mod extractors;
pub mod models;
pub mod orchestrator;
pub mod tools;
pub mod traits;
pub mod utils;

pub use diagnostics::{diagnose_error, FailureReason};
pub use errors::DownloadError;
pub use models::{
    DownloadOutcome, DownloadRequest, ExtractedLinks, Link, MediaType, Platform, ProbeResult,
    ProbeSource, SaveMode, Totals,
};
pub use orchestrator::Downloader;
pub use tools::{ToolInfo, ToolManager, ToolPaths, ToolType};
pub use traits::DownloaderBackend;
