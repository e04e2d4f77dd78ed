use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::downloader::errors::DownloadError;
use crate::downloader::models::{DownloadRequest, SaveMode};
use crate::downloader::tools::ToolType;
use crate::downloader::traits::DownloaderBackend;
use crate::downloader::utils::{check_output, push_cookie_args, run_output_with_timeout};

/// Gallery-oriented backend driving the `gallery-dl` binary.
///
/// `-d` keeps gallery-dl's own `<category>/<user>` subdirectories, which is
/// the by-uploader layout; `-D` writes straight into the target directory.
pub struct GalleryDlBackend {
    binary_path: String,
    cookies_from_browser: Option<String>,
}

impl GalleryDlBackend {
    pub fn new(binary_path: impl Into<String>, cookies_from_browser: Option<String>) -> Self {
        Self {
            binary_path: binary_path.into(),
            cookies_from_browser,
        }
    }

    pub fn build_args(&self, request: &DownloadRequest) -> Vec<String> {
        let mut args = Vec::new();
        push_cookie_args(&mut args, self.cookies_from_browser.as_deref());

        let dir_flag = match request.save_mode {
            SaveMode::ByUploader => "-d",
            SaveMode::Flat => "-D",
        };
        args.push(dir_flag.to_string());
        args.push(request.output_dir.to_string_lossy().to_string());
        args.push(request.url.clone());
        args
    }
}

#[async_trait]
impl DownloaderBackend for GalleryDlBackend {
    fn name(&self) -> &'static str {
        "gallery-dl"
    }

    fn tool(&self) -> ToolType {
        ToolType::GalleryDl
    }

    async fn download(
        &self,
        request: &DownloadRequest,
        cancel: &CancellationToken,
    ) -> Result<(), DownloadError> {
        let args = self.build_args(request);
        let output =
            run_output_with_timeout(&self.binary_path, &args, request.timeout, cancel).await?;
        check_output(&output)
    }
}
