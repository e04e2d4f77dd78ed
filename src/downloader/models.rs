// Common data models for link intake, auditing and downloading

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::diagnostics::{diagnose_error, FailureReason};
use super::errors::DownloadError;
use super::tools::ToolType;

/// Source platforms the intake pipeline knows how to route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Instagram,
    Tiktok,
    Twitter,
    Kwai,
    Unknown,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Instagram => "instagram",
            Self::Tiktok => "tiktok",
            Self::Twitter => "twitter",
            Self::Kwai => "kwai",
            Self::Unknown => "unknown",
        }
    }

    /// Every platform except `Unknown` can be handed to a downloader
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unique, normalized link produced by the intake pipeline.
///
/// Identity is `url`; `original_url` keeps the text as it first appeared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub url: String,
    pub original_url: String,
    pub platform: Platform,
}

/// Coarse media classification used by the audit pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Video,
    Image,
    Mixed,
    Unknown,
}

/// Where a media type guess came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeSource {
    /// Structured metadata from the prober
    Prober,
    /// URL/platform heuristics
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub url: String,
    pub platform: Platform,
    pub media_type: MediaType,
    pub source: ProbeSource,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Output naming convention handed to the tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveMode {
    /// One subdirectory per uploader/profile
    #[default]
    #[serde(alias = "perfil")]
    ByUploader,
    /// Everything in the output directory itself
    Flat,
}

/// Everything a backend needs to fetch one link
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
    pub platform: Platform,
    pub save_mode: SaveMode,
    pub output_dir: PathBuf,
    pub timeout: Duration,
}

/// Final result for one link in a batch (last attempt wins)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadOutcome {
    pub url: String,
    pub platform: Platform,
    pub tool: ToolType,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<FailureReason>,
}

impl DownloadOutcome {
    pub fn succeeded(url: &str, platform: Platform, tool: ToolType) -> Self {
        Self {
            url: url.to_string(),
            platform,
            tool,
            success: true,
            error: None,
            reason: None,
        }
    }

    pub fn failed(url: &str, platform: Platform, tool: ToolType, err: &DownloadError) -> Self {
        let reason = match err {
            DownloadError::Cancelled => Some(FailureReason::Cancelled),
            DownloadError::Timeout(_) => Some(FailureReason::NetworkTimeout),
            DownloadError::ToolNotFound(_) => Some(FailureReason::ToolMissing),
            other => diagnose_error(&other.to_string()),
        };

        Self {
            url: url.to_string(),
            platform,
            tool,
            success: false,
            error: Some(err.to_string()),
            reason,
        }
    }

    /// Outcome for a link that was still queued when its batch was cancelled
    pub fn cancelled(link: &Link, tool: ToolType) -> Self {
        Self::failed(&link.url, link.platform, tool, &DownloadError::Cancelled)
    }
}

/// Counters reported alongside an extraction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    /// Raw URL matches before deduplication
    pub extracted: usize,
    pub unique: usize,
    pub supported: usize,
    pub unsupported: usize,
}

/// Result of running the intake pipeline over a block of text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedLinks {
    pub links: Vec<Link>,
    pub unsupported_links: Vec<String>,
    pub totals: Totals,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_mode_accepts_legacy_alias() {
        let mode: SaveMode = serde_json::from_str("\"perfil\"").unwrap();
        assert_eq!(mode, SaveMode::ByUploader);
        let mode: SaveMode = serde_json::from_str("\"flat\"").unwrap();
        assert_eq!(mode, SaveMode::Flat);
    }

    #[test]
    fn test_cancelled_outcome() {
        let link = Link {
            url: "https://instagram.com/p/abc".to_string(),
            original_url: "https://www.instagram.com/p/abc".to_string(),
            platform: Platform::Instagram,
        };
        let outcome = DownloadOutcome::cancelled(&link, ToolType::GalleryDl);
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("cancelled"));
        assert_eq!(outcome.reason, Some(FailureReason::Cancelled));
    }

    #[test]
    fn test_platform_serializes_lowercase() {
        let json = serde_json::to_string(&Platform::Tiktok).unwrap();
        assert_eq!(json, "\"tiktok\"");
        assert!(!Platform::Unknown.is_supported());
        assert!(Platform::Kwai.is_supported());
    }
}
