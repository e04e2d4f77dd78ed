// MetadataProber trait and common types

use async_trait::async_trait;

use crate::downloader::errors::DownloadError;

/// Configuration for metadata probing
#[derive(Debug, Clone)]
pub struct ProberConfig {
    /// Browser to borrow cookies from (chrome, firefox, ...)
    pub cookies_from_browser: Option<String>,
    /// Probe timeout in seconds, independent of the download timeout
    pub timeout_seconds: u64,
}

impl Default for ProberConfig {
    fn default() -> Self {
        Self {
            cookies_from_browser: None,
            timeout_seconds: 60,
        }
    }
}

impl ProberConfig {
    pub fn with_cookies_from_browser(mut self, browser: Option<String>) -> Self {
        self.cookies_from_browser = browser;
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }
}

/// Fetches structured metadata for one link without downloading media
#[async_trait]
pub trait MetadataProber: Send + Sync {
    /// Name of the prober (for logging)
    fn name(&self) -> &'static str;

    /// Raw metadata document for `url`
    async fn probe(&self, url: &str) -> Result<serde_json::Value, DownloadError>;
}
