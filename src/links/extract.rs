use std::collections::HashSet;

use futures::stream::{self, StreamExt};
use regex::Regex;
use tracing::{debug, info};

use super::normalize::{normalize_url, trim_trailing_punctuation};
use super::platform::detect_platform;
use super::shortener::{is_shortener, ShortUrlResolver};
use crate::downloader::models::{ExtractedLinks, Link, Platform, Totals};

lazy_static::lazy_static! {
    static ref URL_RE: Regex = Regex::new(r#"https?://[^\s<>"'\\]+"#).unwrap();
}

/// Raw URL-shaped substrings, in order of appearance
pub fn find_urls(text: &str) -> Vec<&str> {
    URL_RE.find_iter(text).map(|m| m.as_str()).collect()
}

/// Keep the first link per normalized URL
fn dedup(links: Vec<Link>) -> Vec<Link> {
    let mut seen = HashSet::new();
    links
        .into_iter()
        .filter(|link| seen.insert(link.url.clone()))
        .collect()
}

/// Run the intake pipeline over free text.
///
/// Never fails: malformed URLs stay as-is and land in `unsupported_links`,
/// and short links that cannot be expanded stay `Unknown`. At most
/// `resolve_concurrency` short links are being expanded at any time.
pub async fn extract_links(
    text: &str,
    resolver: &dyn ShortUrlResolver,
    resolve_concurrency: usize,
) -> ExtractedLinks {
    let raw_urls = find_urls(text);

    let first_pass = dedup(
        raw_urls
            .iter()
            .map(|raw| {
                let url = normalize_url(raw);
                Link {
                    platform: detect_platform(&url),
                    original_url: trim_trailing_punctuation(raw).to_string(),
                    url,
                }
            })
            .collect(),
    );

    let expanded: Vec<Link> = stream::iter(first_pass)
        .map(|mut link| async move {
            if link.platform == Platform::Unknown && is_shortener(&link.url) {
                let resolved = normalize_url(&resolver.resolve(&link.url).await);
                debug!(short = %link.url, resolved = %resolved, "expanded short link");
                link.platform = detect_platform(&resolved);
                link.url = resolved;
            }
            link
        })
        .buffered(resolve_concurrency.max(1))
        .collect()
        .await;

    // Two short links may land on the same destination
    let unique = dedup(expanded);

    let (links, unsupported): (Vec<Link>, Vec<Link>) = unique
        .into_iter()
        .partition(|link| link.platform.is_supported());

    let totals = Totals {
        extracted: raw_urls.len(),
        unique: links.len() + unsupported.len(),
        supported: links.len(),
        unsupported: unsupported.len(),
    };
    info!(
        extracted = totals.extracted,
        unique = totals.unique,
        supported = totals.supported,
        unsupported = totals.unsupported,
        "links extracted"
    );

    ExtractedLinks {
        links,
        unsupported_links: unsupported.into_iter().map(|link| link.original_url).collect(),
        totals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::links::shortener::{NoopResolver, DEFAULT_RESOLVE_CONCURRENCY};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct MapResolver(HashMap<&'static str, &'static str>);

    #[async_trait]
    impl ShortUrlResolver for MapResolver {
        async fn resolve(&self, url: &str) -> String {
            self.0.get(url).map(|s| s.to_string()).unwrap_or_else(|| url.to_string())
        }
    }

    /// Expands `https://bit.ly/<n>` to an instagram post after a short wait,
    /// recording how many expansions overlap
    #[derive(Default)]
    struct SlowResolver {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl ShortUrlResolver for SlowResolver {
        async fn resolve(&self, url: &str) -> String {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            url.replace("https://bit.ly/", "https://instagram.com/p/")
        }
    }

    #[test]
    fn test_find_urls_stops_at_quotes_and_brackets() {
        let text = r#"see "https://a.com/x" or <https://b.com/y> and https://c.com/z's"#;
        assert_eq!(
            find_urls(text),
            vec!["https://a.com/x", "https://b.com/y", "https://c.com/z"]
        );
    }

    #[tokio::test]
    async fn test_query_and_www_variants_collapse() {
        let text = "check https://www.instagram.com/reel/ABC?utm=1 and https://instagram.com/reel/ABC";
        let result = extract_links(text, &NoopResolver, DEFAULT_RESOLVE_CONCURRENCY).await;

        assert_eq!(result.links.len(), 1);
        assert_eq!(result.links[0].url, "https://instagram.com/reel/ABC");
        assert_eq!(result.links[0].platform, Platform::Instagram);
        assert_eq!(
            result.links[0].original_url,
            "https://www.instagram.com/reel/ABC?utm=1"
        );
        assert_eq!(
            result.totals,
            Totals {
                extracted: 2,
                unique: 1,
                supported: 1,
                unsupported: 0
            }
        );
    }

    #[tokio::test]
    async fn test_short_link_is_reclassified() {
        let resolver = MapResolver(HashMap::from([(
            "https://bit.ly/xyz",
            "https://tiktok.com/@u/video/123",
        )]));
        let result = extract_links("https://bit.ly/xyz", &resolver, DEFAULT_RESOLVE_CONCURRENCY).await;

        assert_eq!(result.links.len(), 1);
        assert_eq!(result.links[0].platform, Platform::Tiktok);
        assert_eq!(result.links[0].url, "https://tiktok.com/@u/video/123");
        assert_eq!(result.links[0].original_url, "https://bit.ly/xyz");
        assert!(result.unsupported_links.is_empty());
    }

    #[tokio::test]
    async fn test_short_links_to_same_target_dedup() {
        let resolver = MapResolver(HashMap::from([
            ("https://bit.ly/one", "https://www.tiktok.com/@u/video/9?lang=en"),
            ("https://t.co/two", "https://tiktok.com/@u/video/9"),
        ]));
        let result = extract_links("https://bit.ly/one https://t.co/two", &resolver, DEFAULT_RESOLVE_CONCURRENCY).await;

        assert_eq!(result.links.len(), 1);
        assert_eq!(result.links[0].original_url, "https://bit.ly/one");
        assert_eq!(result.totals.extracted, 2);
        assert_eq!(result.totals.unique, 1);
    }

    #[tokio::test]
    async fn test_unresolved_short_link_stays_unsupported() {
        let result = extract_links("go to https://bit.ly/dead!", &NoopResolver, DEFAULT_RESOLVE_CONCURRENCY).await;
        assert!(result.links.is_empty());
        assert_eq!(result.unsupported_links, vec!["https://bit.ly/dead"]);
    }

    #[tokio::test]
    async fn test_unknown_hosts_are_partitioned() {
        let text = "https://x.com/u/status/1, https://example.com/page?id=7#frag. \
                    https://www.kwai.com/@k/video/5 (https://vm.tiktok.com/ZMabc/)";
        let result = extract_links(text, &NoopResolver, DEFAULT_RESOLVE_CONCURRENCY).await;

        let platforms: Vec<Platform> = result.links.iter().map(|l| l.platform).collect();
        assert_eq!(
            platforms,
            vec![Platform::Twitter, Platform::Kwai, Platform::Tiktok]
        );
        assert_eq!(
            result.unsupported_links,
            vec!["https://example.com/page?id=7#frag"]
        );
        assert_eq!(result.totals.supported, 3);
        assert_eq!(result.totals.unsupported, 1);
    }

    #[tokio::test]
    async fn test_no_links() {
        let result = extract_links("nothing to see here", &NoopResolver, DEFAULT_RESOLVE_CONCURRENCY).await;
        assert_eq!(result, ExtractedLinks::default());
    }

    #[tokio::test]
    async fn test_output_has_no_duplicate_urls() {
        let text = "https://instagram.com/p/A https://instagram.com/p/A?x=1 \
                    https://www.instagram.com/p/A#c https://example.com/?q=1 \
                    https://example.com/?q=1 https://example.com/?q=2";
        let result = extract_links(text, &NoopResolver, DEFAULT_RESOLVE_CONCURRENCY).await;

        let mut seen = HashSet::new();
        assert!(result.links.iter().all(|l| seen.insert(l.url.clone())));
        assert_eq!(result.totals.extracted, 6);
        assert_eq!(result.totals.unique, 3);
    }

    #[tokio::test]
    async fn test_reextraction_is_stable() {
        let text = "https://www.instagram.com/reel/R1?igsh=a, https://t.co/nowhere \
                    https://example.org/a?b=c https://twitter.com/u/status/2";
        let first = extract_links(text, &NoopResolver, DEFAULT_RESOLVE_CONCURRENCY).await;

        let recombined: Vec<String> = first
            .links
            .iter()
            .map(|l| l.url.clone())
            .chain(first.unsupported_links.iter().cloned())
            .collect();
        let second = extract_links(&recombined.join("\n"), &NoopResolver, DEFAULT_RESOLVE_CONCURRENCY).await;

        let urls = |r: &ExtractedLinks| r.links.iter().map(|l| l.url.clone()).collect::<Vec<_>>();
        assert_eq!(urls(&first), urls(&second));
        assert_eq!(first.unsupported_links, second.unsupported_links);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_link_expansion_is_bounded() {
        let text: Vec<String> = (0..200).map(|i| format!("https://bit.ly/l{}", i)).collect();
        let resolver = SlowResolver::default();

        let result = extract_links(&text.join(" "), &resolver, 3).await;

        assert_eq!(resolver.peak.load(Ordering::SeqCst), 3);
        assert_eq!(result.links.len(), 200);
        assert_eq!(result.links[0].url, "https://instagram.com/p/l0");
        assert_eq!(result.links[199].url, "https://instagram.com/p/l199");
        assert!(result.links.iter().all(|l| l.platform == Platform::Instagram));
    }
}
