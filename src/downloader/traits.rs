// Downloader backend trait definition

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::errors::DownloadError;
use super::models::DownloadRequest;
use super::tools::ToolType;

/// One external single-URL download tool.
///
/// Implementations must stop promptly once `cancel` fires and must not run
/// past `request.timeout`.
#[async_trait]
pub trait DownloaderBackend: Send + Sync {
    /// Name of the backend (for logging)
    fn name(&self) -> &'static str;

    /// Tool reported in the outcome of every link routed here
    fn tool(&self) -> ToolType;

    /// Fetch one link into `request.output_dir`
    async fn download(
        &self,
        request: &DownloadRequest,
        cancel: &CancellationToken,
    ) -> Result<(), DownloadError>;
}
