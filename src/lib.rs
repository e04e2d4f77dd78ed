//! Batch media downloader for social platform links.
//!
//! Text goes in, unique classified links come out ([`links`]); links can be
//! audited for their media type ([`downloader::extractors`]) and downloaded in
//! bounded, cancellable batches by external tools ([`scheduler`]).

pub mod config;
pub mod downloader;
pub mod error;
pub mod links;
pub mod scheduler;

use std::sync::Arc;

use tracing::{debug, info};

pub use config::AppConfig;
pub use downloader::{
    DownloadOutcome, ExtractedLinks, Link, MediaType, Platform, ProbeResult, SaveMode, ToolInfo,
};
pub use error::{Error, Result};
pub use scheduler::{BatchEvent, BatchHandle, BatchId, BatchOptions};

use downloader::extractors::{MediaAuditor, MetadataProber, ProberConfig, YtDlpProber};
use downloader::{Downloader, ToolManager, ToolType};
use links::{HttpShortUrlResolver, NoopResolver, ShortUrlResolver};
use scheduler::BatchScheduler;

/// Service facade: the operations a front end (CLI or GUI shell) calls.
pub struct InstaBatch {
    config: AppConfig,
    resolver: Arc<dyn ShortUrlResolver>,
    auditor: MediaAuditor,
    scheduler: BatchScheduler,
    tools: ToolManager,
}

impl InstaBatch {
    /// Wire up the real collaborators: HTTP short-link resolver, `yt-dlp`
    /// prober and the `yt-dlp` / `gallery-dl` download backends.
    pub fn new(config: AppConfig) -> Result<Self> {
        config.validate()?;

        let resolver: Arc<dyn ShortUrlResolver> = if config.resolve_short_links {
            Arc::new(HttpShortUrlResolver::new(
                config.resolve_timeout(),
                config.proxy.as_deref(),
            )?)
        } else {
            Arc::new(NoopResolver)
        };

        let prober = Arc::new(YtDlpProber::new(
            config.tools.path_for(ToolType::YtDlp),
            ProberConfig::default()
                .with_cookies_from_browser(config.cookies_from_browser.clone())
                .with_timeout(config.probe_timeout_secs),
        ));

        let downloader = Arc::new(Downloader::with_tools(
            &config.tools,
            config.cookies_from_browser.clone(),
        ));

        Ok(Self::with_components(config, resolver, prober, downloader))
    }

    /// Assemble from explicit collaborators
    pub fn with_components(
        config: AppConfig,
        resolver: Arc<dyn ShortUrlResolver>,
        prober: Arc<dyn MetadataProber>,
        downloader: Arc<Downloader>,
    ) -> Self {
        let auditor = MediaAuditor::new(prober, config.audit_concurrency);
        let scheduler = BatchScheduler::new(downloader, config.output_dir.clone());
        let tools = ToolManager::new(config.tools.clone());

        Self {
            config,
            resolver,
            auditor,
            scheduler,
            tools,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Extract, normalize, deduplicate and classify every link in `text`
    pub async fn parse_links(&self, text: &str) -> ExtractedLinks {
        let extracted = links::extract_links(
            text,
            self.resolver.as_ref(),
            self.config.resolve_concurrency,
        )
        .await;
        debug!(
            extracted = extracted.totals.extracted,
            unique = extracted.totals.unique,
            supported = extracted.totals.supported,
            "parsed links"
        );
        extracted
    }

    /// Probe each URL for its media type; results keep the input order
    pub async fn audit_links(&self, urls: &[String]) -> Vec<ProbeResult> {
        self.auditor.audit(urls).await
    }

    /// Start a download batch. `None` uses the batch defaults from the config.
    pub fn start_download_batch(
        &self,
        links: Vec<Link>,
        options: Option<BatchOptions>,
    ) -> BatchHandle {
        let options = options.unwrap_or_else(|| self.config.batch.clone());
        let handle = self.scheduler.start_batch(links, &options);
        info!(batch = %handle.id, "download batch accepted");
        handle
    }

    /// `false` when the batch is unknown or already finished
    pub fn cancel_download_batch(&self, id: BatchId) -> bool {
        self.scheduler.cancel_batch(id)
    }

    /// Availability and version of each external tool
    pub async fn tools_status(&self) -> Vec<ToolInfo> {
        self.tools.get_all_tools().await
    }
}
