use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::downloader::errors::DownloadError;
use crate::downloader::models::{DownloadRequest, SaveMode};
use crate::downloader::tools::ToolType;
use crate::downloader::traits::DownloaderBackend;
use crate::downloader::utils::{check_output, push_cookie_args, run_output_with_timeout};

const BY_UPLOADER_TEMPLATE: &str = "%(uploader).40B/%(title).90B [%(id).24B].%(ext)s";
const FLAT_TEMPLATE: &str = "%(title).90B [%(id).24B].%(ext)s";

/// Video-oriented backend driving the `yt-dlp` binary
pub struct YtDlpBackend {
    binary_path: String,
    cookies_from_browser: Option<String>,
}

impl YtDlpBackend {
    pub fn new(binary_path: impl Into<String>, cookies_from_browser: Option<String>) -> Self {
        Self {
            binary_path: binary_path.into(),
            cookies_from_browser,
        }
    }

    pub fn build_args(&self, request: &DownloadRequest) -> Vec<String> {
        let mut args = vec![
            "--no-warnings".to_string(),
            "--no-progress".to_string(),
            "--output-na-placeholder".to_string(),
            "na".to_string(),
        ];

        push_cookie_args(&mut args, self.cookies_from_browser.as_deref());

        args.push("-P".to_string());
        args.push(request.output_dir.to_string_lossy().to_string());

        let template = match request.save_mode {
            SaveMode::ByUploader => BY_UPLOADER_TEMPLATE,
            SaveMode::Flat => FLAT_TEMPLATE,
        };
        args.push("-o".to_string());
        args.push(template.to_string());

        args.push(request.url.clone());
        args
    }
}

#[async_trait]
impl DownloaderBackend for YtDlpBackend {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    fn tool(&self) -> ToolType {
        ToolType::YtDlp
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
