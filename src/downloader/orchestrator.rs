// Orchestrator with per-platform routing

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::backends::{GalleryDlBackend, YtDlpBackend};
use super::errors::DownloadError;
use super::models::{DownloadRequest, Platform};
use super::tools::{ToolPaths, ToolType};
use super::traits::DownloaderBackend;

/// Routes each link to one of two tool classes: the video tool for kwai,
/// the gallery tool for every other platform.
pub struct Downloader {
    video: Arc<dyn DownloaderBackend>,
    gallery: Arc<dyn DownloaderBackend>,
}

impl Downloader {
    pub fn new(video: Arc<dyn DownloaderBackend>, gallery: Arc<dyn DownloaderBackend>) -> Self {
        Self { video, gallery }
    }

    /// The stock `yt-dlp` + `gallery-dl` pair
    pub fn with_tools(paths: &ToolPaths, cookies_from_browser: Option<String>) -> Self {
        Self::new(
            Arc::new(YtDlpBackend::new(
                paths.path_for(ToolType::YtDlp),
                cookies_from_browser.clone(),
            )),
            Arc::new(GalleryDlBackend::new(
                paths.path_for(ToolType::GalleryDl),
                cookies_from_browser,
            )),
        )
    }

    pub fn route(&self, platform: Platform) -> &Arc<dyn DownloaderBackend> {
        match platform {
            Platform::Kwai => &self.video,
            _ => &self.gallery,
        }
    }

    pub fn tool_for(&self, platform: Platform) -> ToolType {
        self.route(platform).tool()
    }

    pub async fn download(
        &self,
        request: &DownloadRequest,
        cancel: &CancellationToken,
    ) -> Result<(), DownloadError> {
        let backend = self.route(request.platform);
        debug!(backend = backend.name(), url = %request.url, "dispatching download");

        let result = backend.download(request, cancel).await;
        if let Err(ref e) = result {
            warn!(backend = backend.name(), url = %request.url, error = %e, "download failed");
        }
        result
    }
}
