//! Link intake: extraction, normalization, platform detection and
//! short-link expansion.

mod extract;
mod normalize;
mod platform;
mod shortener;

pub use extract::{extract_links, find_urls};
pub use normalize::{normalize_url, trim_trailing_punctuation};
pub use platform::{detect_platform, platform_for_host};
pub use shortener::{
    is_shortener, HttpShortUrlResolver, NoopResolver, ShortUrlResolver, DEFAULT_RESOLVE_CONCURRENCY,
    DEFAULT_RESOLVE_TIMEOUT, SHORTENER_HOSTS,
};
