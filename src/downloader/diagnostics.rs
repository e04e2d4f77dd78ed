// Failure diagnostics - maps tool stderr onto a failure category
//
// yt-dlp and gallery-dl report problems as free-form text. The scheduler
// keeps the raw message as the outcome error and attaches one of these
// categories so callers can group failures without parsing stderr.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Content needs an authenticated session (cookies)
    LoginRequired,

    /// Private account or post
    PrivateContent,

    /// Post deleted, 404, or otherwise gone
    NotFound,

    /// 429 / "too many requests"
    RateLimited,

    /// HTTP 403 without a more specific hint
    Forbidden,

    /// The tool has no extractor for this URL
    UnsupportedUrl,

    /// Timeout, refused or unreachable connection
    NetworkTimeout,

    /// The external binary is not available
    ToolMissing,

    /// Batch cancellation
    Cancelled,

    Unknown,
}

impl FailureReason {
    /// Whether trying again later could plausibly succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::NetworkTimeout | Self::Forbidden | Self::Unknown
        )
    }

    /// Whether browser cookies are likely to fix it
    pub fn cookies_might_help(&self) -> bool {
        matches!(
            self,
            Self::LoginRequired | Self::PrivateContent | Self::Forbidden | Self::RateLimited
        )
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::LoginRequired => "Login required",
            Self::PrivateContent => "Private content",
            Self::NotFound => "Content not found",
            Self::RateLimited => "Rate limited by the platform",
            Self::Forbidden => "Access denied (HTTP 403)",
            Self::UnsupportedUrl => "URL not supported by the tool",
            Self::NetworkTimeout => "Network timeout",
            Self::ToolMissing => "Download tool not installed",
            Self::Cancelled => "Cancelled",
            Self::Unknown => "Unknown failure",
        }
    }

    /// Follow-up suggestion shown next to a failed link
    pub fn hint(&self, using_cookies: bool) -> Option<&'static str> {
        if self.cookies_might_help() && !using_cookies {
            Some("try again with cookies from a logged-in browser")
        } else if self.is_transient() {
            Some("may succeed if retried later")
        } else if *self == Self::ToolMissing {
            Some("install the tool or set its path in the config")
        } else {
            None
        }
    }
}

/// Analyze an error message and return the failure category
pub fn diagnose_error(error: &str) -> Option<FailureReason> {
    let lower = error.to_lowercase();

    if lower.trim() == "cancelled" {
        return Some(FailureReason::Cancelled);
    }

    if lower.contains("not found: install")
        || lower.contains("command not found")
        || lower.contains("no such file or directory")
    {
        return Some(FailureReason::ToolMissing);
    }

    if lower.contains("unsupported url") || lower.contains("no suitable extractor") {
        return Some(FailureReason::UnsupportedUrl);
    }

    if lower.contains("login required")
        || lower.contains("log in")
        || lower.contains("login")
        || lower.contains("cookies")
        || lower.contains("authentication")
    {
        return Some(FailureReason::LoginRequired);
    }

    if lower.contains("private") {
        return Some(FailureReason::PrivateContent);
    }

    if lower.contains("404")
        || lower.contains("not found")
        || lower.contains("unavailable")
        || lower.contains("has been removed")
        || lower.contains("does not exist")
    {
        return Some(FailureReason::NotFound);
    }

    if lower.contains("429") || lower.contains("rate limit") || lower.contains("too many requests") {
        return Some(FailureReason::RateLimited);
    }

    if lower.contains("403") || lower.contains("forbidden") {
        return Some(FailureReason::Forbidden);
    }

    if lower.contains("timeout")
        || lower.contains("timed out")
        || lower.contains("connection refused")
        || lower.contains("network unreachable")
    {
        return Some(FailureReason::NetworkTimeout);
    }

    if !error.trim().is_empty() {
        return Some(FailureReason::Unknown);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_detection() {
        let error = "ERROR: [Instagram] ABC: Requested content is not available, rate-limit reached or login required";
        assert_eq!(diagnose_error(error), Some(FailureReason::LoginRequired));
    }

    #[test]
    fn test_unsupported_detection() {
        let error = "ERROR: Unsupported URL: https://example.com/";
        assert_eq!(diagnose_error(error), Some(FailureReason::UnsupportedUrl));
    }

    #[test]
    fn test_gallery_dl_no_extractor() {
        let error = "[gallery-dl][error] No suitable extractor found for 'https://example.com'";
        assert_eq!(diagnose_error(error), Some(FailureReason::UnsupportedUrl));
    }

    #[test]
    fn test_not_found_detection() {
        let error = "[twitter][error] HttpError: '404 Not Found' for 'https://x.com/i/status/1'";
        assert_eq!(diagnose_error(error), Some(FailureReason::NotFound));
    }

    #[test]
    fn test_rate_limit_detection() {
        let error = "HTTP Error 429: Too Many Requests";
        assert_eq!(diagnose_error(error), Some(FailureReason::RateLimited));
    }

    #[test]
    fn test_forbidden_detection() {
        let error = "ERROR: HTTP Error 403: Forbidden";
        assert_eq!(diagnose_error(error), Some(FailureReason::Forbidden));
    }

    #[test]
    fn test_timeout_detection() {
        assert_eq!(
            diagnose_error("timed out after 180s"),
            Some(FailureReason::NetworkTimeout)
        );
    }

    #[test]
    fn test_cancelled_and_exit_code() {
        assert_eq!(diagnose_error("cancelled"), Some(FailureReason::Cancelled));
        assert_eq!(
            diagnose_error("Process exited with code 1"),
            Some(FailureReason::Unknown)
        );
        assert_eq!(diagnose_error("   "), None);
    }

    #[test]
    fn test_transient_flags() {
        assert!(FailureReason::RateLimited.is_transient());
        assert!(!FailureReason::NotFound.is_transient());
        assert!(FailureReason::LoginRequired.cookies_might_help());
        assert!(!FailureReason::ToolMissing.cookies_might_help());
    }

    #[test]
    fn test_hints() {
        assert_eq!(
            FailureReason::LoginRequired.hint(false),
            Some("try again with cookies from a logged-in browser")
        );
        assert_eq!(FailureReason::LoginRequired.hint(true), None);
        assert_eq!(
            FailureReason::RateLimited.hint(true),
            Some("may succeed if retried later")
        );
        assert!(FailureReason::ToolMissing.hint(false).is_some());
        assert_eq!(FailureReason::NotFound.hint(false), None);
        assert_eq!(FailureReason::Cancelled.hint(false), None);
    }
}
