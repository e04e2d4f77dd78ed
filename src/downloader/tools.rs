use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

/// A tool that hangs on `--version` counts as unavailable
const VERSION_TIMEOUT: Duration = Duration::from_secs(10);

/// External programs the backends drive
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ToolType {
    /// Video-oriented tool
    #[serde(rename = "yt-dlp")]
    YtDlp,
    /// Gallery-oriented tool
    #[serde(rename = "gallery-dl")]
    GalleryDl,
}

impl ToolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "yt-dlp",
            ToolType::GalleryDl => "gallery-dl",
        }
    }
}

impl std::fmt::Display for ToolType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Binary locations; bare names are looked up on PATH by the OS
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    pub yt_dlp: String,
    pub gallery_dl: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            yt_dlp: ToolType::YtDlp.as_str().to_string(),
            gallery_dl: ToolType::GalleryDl.as_str().to_string(),
        }
    }
}

impl ToolPaths {
    pub fn path_for(&self, tool_type: ToolType) -> &str {
        match tool_type {
            ToolType::YtDlp => &self.yt_dlp,
            ToolType::GalleryDl => &self.gallery_dl,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub tool_type: ToolType,
    pub version: Option<String>,
    pub path: String,
    pub is_available: bool,
}

pub struct ToolManager {
    paths: ToolPaths,
}

impl ToolManager {
    pub fn new(paths: ToolPaths) -> Self {
        Self { paths }
    }

    pub async fn get_tool_info(&self, tool_type: ToolType) -> ToolInfo {
        let path = self.paths.path_for(tool_type).to_string();
        let version = self.get_version(&path).await;

        ToolInfo {
            name: tool_type.as_str().to_string(),
            tool_type,
            is_available: version.is_some(),
            version,
            path,
        }
    }

    pub async fn get_all_tools(&self) -> Vec<ToolInfo> {
        let (yt_dlp, gallery_dl) = tokio::join!(
            self.get_tool_info(ToolType::YtDlp),
            self.get_tool_info(ToolType::GalleryDl),
        );
        vec![yt_dlp, gallery_dl]
    }

    async fn get_version(&self, path: &str) -> Option<String> {
        // Both tools print a bare version string for --version
        let output = Command::new(path)
            .arg("--version")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();
        match timeout(VERSION_TIMEOUT, output).await {
            Ok(Ok(output)) if output.status.success() => {
                let out = String::from_utf8_lossy(&output.stdout).trim().to_string();
                Some(out)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_names_match_binaries() {
        assert_eq!(ToolType::YtDlp.as_str(), "yt-dlp");
        assert_eq!(
            serde_json::to_string(&ToolType::GalleryDl).unwrap(),
            "\"gallery-dl\""
        );
    }

    #[tokio::test]
    async fn test_missing_binary_is_unavailable() {
        let manager = ToolManager::new(ToolPaths {
            yt_dlp: "/nonexistent/instabatch-yt-dlp".to_string(),
            gallery_dl: "/nonexistent/instabatch-gallery-dl".to_string(),
        });
        let tools = manager.get_all_tools().await;
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].tool_type, ToolType::YtDlp);
        assert!(tools.iter().all(|t| !t.is_available && t.version.is_none()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_version_read_from_stdout() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-gallery-dl");
        std::fs::write(&script, "#!/bin/sh\necho 1.27.3\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let manager = ToolManager::new(ToolPaths {
            yt_dlp: "/nonexistent/instabatch-yt-dlp".to_string(),
            gallery_dl: script.to_string_lossy().into_owned(),
        });
        let info = manager.get_tool_info(ToolType::GalleryDl).await;
        assert!(info.is_available);
        assert_eq!(info.version.as_deref(), Some("1.27.3"));
    }
}
