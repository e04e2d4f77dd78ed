use url::Url;

use super::platform::platform_for_host;

/// Characters that end sentences around pasted links but never end a URL
const TRAILING_PUNCTUATION: &[char] = &[')', ']', '}', ',', '.', ';', '!', '?'];

pub fn trim_trailing_punctuation(raw: &str) -> &str {
    raw.trim().trim_end_matches(TRAILING_PUNCTUATION)
}

/// Canonical form of a pasted URL.
///
/// Fragments are always dropped. For known platforms the query string and a
/// leading `www.` are dropped too, so tracking parameters and host aliases
/// collapse onto one link; unknown hosts keep their query untouched.
/// Input that does not parse comes back trimmed but otherwise unchanged.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = trim_trailing_punctuation(raw);
    let Ok(mut parsed) = Url::parse(trimmed) else {
        return trimmed.to_string();
    };

    parsed.set_fragment(None);

    let canonical_host = parsed
        .host_str()
        .filter(|host| platform_for_host(host).is_supported())
        .map(|host| host.strip_prefix("www.").unwrap_or(host).to_string());

    if let Some(host) = canonical_host {
        parsed.set_query(None);
        if parsed.set_host(Some(&host)).is_err() {
            return trimmed.to_string();
        }
    }

    parsed.into()
}
