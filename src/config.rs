// Application configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::downloader::tools::ToolPaths;
use crate::error::{Error, Result};
use crate::links::DEFAULT_RESOLVE_CONCURRENCY;
use crate::scheduler::BatchOptions;

/// Folder created under the user's download directory
pub const OUTPUT_FOLDER_NAME: &str = "InstaBatch";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Shared output directory for every batch
    pub output_dir: PathBuf,
    /// Browser whose cookies the tools may borrow (chrome, firefox, ...)
    pub cookies_from_browser: Option<String>,
    /// Proxy for short-link resolution (http, https, socks5, socks5h)
    pub proxy: Option<String>,
    pub tools: ToolPaths,
    pub probe_timeout_secs: u64,
    pub resolve_timeout_ms: u64,
    /// Expand bit.ly & co. during extraction
    pub resolve_short_links: bool,
    /// Short links expanded in parallel
    pub resolve_concurrency: usize,
    /// Parallel probes during an audit
    pub audit_concurrency: usize,
    /// Defaults for batches started without explicit options
    pub batch: BatchOptions,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: dirs::download_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(OUTPUT_FOLDER_NAME),
            cookies_from_browser: None,
            proxy: None,
            tools: ToolPaths::default(),
            probe_timeout_secs: 60,
            resolve_timeout_ms: 4500,
            resolve_short_links: true,
            resolve_concurrency: DEFAULT_RESOLVE_CONCURRENCY,
            audit_concurrency: 3,
            batch: BatchOptions::default(),
        }
    }
}

impl AppConfig {
    /// Read a JSON config file; missing keys take their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.output_dir.as_os_str().is_empty() {
            return Err(Error::Config("output_dir must not be empty".to_string()));
        }
        if self.audit_concurrency == 0 {
            return Err(Error::Config("audit_concurrency must be at least 1".to_string()));
        }
        if self.resolve_concurrency == 0 {
            return Err(Error::Config("resolve_concurrency must be at least 1".to_string()));
        }
        if self.probe_timeout_secs == 0 {
            return Err(Error::Config("probe_timeout_secs must be at least 1".to_string()));
        }
        if self.resolve_timeout_ms == 0 {
            return Err(Error::Config("resolve_timeout_ms must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_millis(self.resolve_timeout_ms)
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_cookies_from_browser(mut self, browser: Option<String>) -> Self {
        self.cookies_from_browser = browser;
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn with_resolve_short_links(mut self, enabled: bool) -> Self {
        self.resolve_short_links = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::models::SaveMode;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert!(config.output_dir.ends_with(OUTPUT_FOLDER_NAME));
        assert_eq!(config.resolve_timeout(), Duration::from_millis(4500));
        assert_eq!(config.tools.yt_dlp, "yt-dlp");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "output_dir": "/srv/media",
                "cookies_from_browser": "firefox",
                "tools": {{ "gallery_dl": "/opt/bin/gallery-dl" }},
                "batch": {{ "concurrency": 4, "save_mode": "perfil" }}
            }}"#
        )
        .unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/srv/media"));
        assert_eq!(config.cookies_from_browser.as_deref(), Some("firefox"));
        assert_eq!(config.tools.gallery_dl, "/opt/bin/gallery-dl");
        assert_eq!(config.tools.yt_dlp, "yt-dlp");
        assert_eq!(config.batch.concurrency, Some(4));
        assert_eq!(config.batch.save_mode, SaveMode::ByUploader);
        assert_eq!(config.audit_concurrency, 3);
        assert_eq!(config.resolve_concurrency, DEFAULT_RESOLVE_CONCURRENCY);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "audit_concurrency": 0 }}"#).unwrap();
        assert!(matches!(
            AppConfig::load(file.path()),
            Err(Error::Config(_))
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "resolve_concurrency": 0 }}"#).unwrap();
        assert!(matches!(
            AppConfig::load(file.path()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_cli_overrides() {
        let config = AppConfig::default()
            .with_proxy(Some("socks5h://127.0.0.1:9050".to_string()))
            .with_resolve_short_links(false);
        assert_eq!(config.proxy.as_deref(), Some("socks5h://127.0.0.1:9050"));
        assert!(!config.resolve_short_links);
        assert!(AppConfig::default().resolve_short_links);
    }

    #[test]
    fn test_load_reports_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(AppConfig::load(file.path()), Err(Error::Json(_))));
    }
}
