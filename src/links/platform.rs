use url::Url;

use crate::downloader::models::Platform;

/// Classify a URL by hostname. Malformed URLs are `Unknown`.
pub fn detect_platform(url: &str) -> Platform {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(platform_for_host))
        .unwrap_or(Platform::Unknown)
}

pub fn platform_for_host(host: &str) -> Platform {
    let host = host.to_lowercase();

    if host.contains("instagram.com") {
        Platform::Instagram
    } else if host.contains("tiktok.com") {
        Platform::Tiktok
    } else if host == "x.com" || host.ends_with(".x.com") || host.contains("twitter.com") {
        Platform::Twitter
    } else if host.contains("kwai-video.com") || host.contains("kwai.com") {
        Platform::Kwai
    } else {
        Platform::Unknown
    }
}
