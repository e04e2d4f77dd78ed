// Audit orchestrator - probe, classify, fall back to heuristics
//
// A probe failure is never an error for the caller: the result is marked
// `source = fallback, ok = false` and carries the heuristic guess.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info};

use super::classify::{classify_info, fallback_media_type};
use super::traits::MetadataProber;
use crate::downloader::errors::DownloadError;
use crate::downloader::models::{ProbeResult, ProbeSource};
use crate::links::detect_platform;

const PROBE_FAILED: &str = "yt-dlp probe failed";
const UNPARSEABLE_METADATA: &str = "Unable to parse metadata JSON";

pub struct MediaAuditor {
    prober: Arc<dyn MetadataProber>,
    concurrency: usize,
}

impl MediaAuditor {
    pub fn new(prober: Arc<dyn MetadataProber>, concurrency: usize) -> Self {
        Self {
            prober,
            concurrency: concurrency.max(1),
        }
    }

    /// Audit one link
    pub async fn audit_one(&self, url: &str) -> ProbeResult {
        let platform = detect_platform(url);

        match self.prober.probe(url).await {
            Ok(info) => {
                let media_type = classify_info(&info);
                debug!(url, ?media_type, "classified from metadata");
                ProbeResult {
                    url: url.to_string(),
                    platform,
                    media_type,
                    source: ProbeSource::Prober,
                    ok: true,
                    error: None,
                }
            }
            Err(e) => {
                let error = match e {
                    DownloadError::ParseError(_) => UNPARSEABLE_METADATA.to_string(),
                    other => {
                        let message = other.to_string();
                        if message.trim().is_empty() {
                            PROBE_FAILED.to_string()
                        } else {
                            message
                        }
                    }
                };
                debug!(url, prober = self.prober.name(), error = %error, "probe failed, using heuristics");
                ProbeResult {
                    url: url.to_string(),
                    platform,
                    media_type: fallback_media_type(url, platform),
                    source: ProbeSource::Fallback,
                    ok: false,
                    error: Some(error),
                }
            }
        }
    }

    /// Audit many links; results keep input order
    pub async fn audit(&self, urls: &[String]) -> Vec<ProbeResult> {
        let results: Vec<ProbeResult> = stream::iter(urls)
            .map(|url| self.audit_one(url))
            .buffered(self.concurrency)
            .collect()
            .await;

        let probed = results.iter().filter(|r| r.ok).count();
        info!(total = results.len(), probed, "audit finished");
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::models::{MediaType, Platform};
    use async_trait::async_trait;
    use serde_json::json;

    struct FixedProber(Result<serde_json::Value, DownloadError>);

    #[async_trait]
    impl MetadataProber for FixedProber {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn probe(&self, _url: &str) -> Result<serde_json::Value, DownloadError> {
            self.0.clone()
        }
    }

    fn auditor(result: Result<serde_json::Value, DownloadError>) -> MediaAuditor {
        MediaAuditor::new(Arc::new(FixedProber(result)), 2)
    }

    #[tokio::test]
    async fn test_probe_success_uses_metadata() {
        let result = auditor(Ok(json!({"vcodec": "h264"})))
            .audit_one("https://instagram.com/p/ABC")
            .await;
        assert_eq!(result.platform, Platform::Instagram);
        assert_eq!(result.media_type, MediaType::Video);
        assert_eq!(result.source, ProbeSource::Prober);
        assert!(result.ok);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_probe_failure_falls_back() {
        let result = auditor(Err(DownloadError::Failed("ERROR: login required".to_string())))
            .audit_one("https://www.tiktok.com/@u/photo/9")
            .await;
        assert_eq!(result.media_type, MediaType::Image);
        assert_eq!(result.source, ProbeSource::Fallback);
        assert!(!result.ok);
        assert_eq!(result.error.as_deref(), Some("ERROR: login required"));
    }

    #[tokio::test]
    async fn test_empty_stderr_and_bad_json_messages() {
        let result = auditor(Err(DownloadError::Failed(String::new())))
            .audit_one("https://kwai.com/v/1")
            .await;
        assert_eq!(result.error.as_deref(), Some(PROBE_FAILED));
        assert_eq!(result.media_type, MediaType::Video);

        let result = auditor(Err(DownloadError::ParseError("Invalid JSON".to_string())))
            .audit_one("https://x.com/u/status/1")
            .await;
        assert_eq!(result.error.as_deref(), Some(UNPARSEABLE_METADATA));
        assert_eq!(result.media_type, MediaType::Unknown);
    }

    #[tokio::test]
    async fn test_audit_preserves_order() {
        let urls = vec![
            "https://kwai.com/a".to_string(),
            "https://instagram.com/p/b".to_string(),
            "https://example.com/c".to_string(),
        ];
        let results = auditor(Ok(json!({"ext": "png"}))).audit(&urls).await;
        let got: Vec<&str> = results.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(got, urls.iter().map(String::as_str).collect::<Vec<_>>());
        assert_eq!(results[2].platform, Platform::Unknown);
    }
}
