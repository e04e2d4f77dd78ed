// CLI prober - uses native `yt-dlp --dump-single-json`
//
// Only metadata is fetched (--skip-download). Galleries and carousels come
// back as a single document with an `entries` array.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::traits::{MetadataProber, ProberConfig};
use crate::downloader::errors::DownloadError;
use crate::downloader::utils::{push_cookie_args, run_output_with_timeout};

/// CLI-based prober using the yt-dlp binary
pub struct YtDlpProber {
    ytdlp_path: String,
    config: ProberConfig,
}

impl YtDlpProber {
    pub fn new(ytdlp_path: impl Into<String>, config: ProberConfig) -> Self {
        Self {
            ytdlp_path: ytdlp_path.into(),
            config,
        }
    }

    /// Build command arguments
    fn build_args(&self, url: &str) -> Vec<String> {
        let mut args = vec![
            "--skip-download".to_string(),
            "--dump-single-json".to_string(),
            "--no-warnings".to_string(),
        ];

        push_cookie_args(&mut args, self.config.cookies_from_browser.as_deref());

        args.push(url.to_string());
        args
    }

    /// Parse JSON output
    fn parse_json(stdout: &[u8]) -> Result<serde_json::Value, DownloadError> {
        serde_json::from_slice(stdout)
            .map_err(|e| DownloadError::ParseError(format!("Invalid JSON: {}", e)))
    }
}

#[async_trait]
impl MetadataProber for YtDlpProber {
    fn name(&self) -> &'static str {
        "cli-yt-dlp"
    }

    async fn probe(&self, url: &str) -> Result<serde_json::Value, DownloadError> {
        let args = self.build_args(url);
        debug!(prober = self.name(), url, "probing");

        // Audits are not cancellable from outside; the timeout bounds them
        let cancel = CancellationToken::new();
        let output = run_output_with_timeout(
            &self.ytdlp_path,
            &args,
            Duration::from_secs(self.config.timeout_seconds),
            &cancel,
        )
        .await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() || stdout.trim().is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(DownloadError::Failed(stderr));
        }

        Self::parse_json(&output.stdout)
    }
}
