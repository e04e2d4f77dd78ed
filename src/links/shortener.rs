//! Short-link expansion.
//!
//! Only links on a known shortener host are expanded. Resolution never
//! fails: any network error or timeout leaves the link as it was.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{redirect, Client, Method};
use tracing::debug;
use url::Url;

use super::normalize::normalize_url;
use crate::error::Result;

pub const SHORTENER_HOSTS: &[&str] = &[
    "bit.ly",
    "www.bit.ly",
    "t.co",
    "tinyurl.com",
    "is.gd",
    "cutt.ly",
    "buff.ly",
];

pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_millis(4500);

/// Short links expanded in parallel during one extraction
pub const DEFAULT_RESOLVE_CONCURRENCY: usize = 4;

const MAX_REDIRECTS: usize = 10;
const USER_AGENT: &str = concat!("instabatch/", env!("CARGO_PKG_VERSION"));

pub fn is_shortener(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_lowercase))
        .is_some_and(|host| SHORTENER_HOSTS.contains(&host.as_str()))
}

/// Expands a short link to its final destination
#[async_trait]
pub trait ShortUrlResolver: Send + Sync {
    /// Final URL, or `url` unchanged when it cannot be resolved
    async fn resolve(&self, url: &str) -> String;
}

/// Resolver used when expansion is switched off
pub struct NoopResolver;

#[async_trait]
impl ShortUrlResolver for NoopResolver {
    async fn resolve(&self, url: &str) -> String {
        url.to_string()
    }
}

/// Follows redirects over HTTP: HEAD first, GET when HEAD goes nowhere
pub struct HttpShortUrlResolver {
    client: Client,
}

impl HttpShortUrlResolver {
    pub fn new(timeout: Duration, proxy: Option<&str>) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(timeout)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(USER_AGENT);

        if let Some(proxy_url) = proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    async fn follow(&self, method: Method, url: &str) -> String {
        match self.client.request(method.clone(), url).send().await {
            Ok(response) => normalize_url(response.url().as_str()),
            Err(e) => {
                debug!(%method, url, error = %e, "short link request failed");
                url.to_string()
            }
        }
    }
}

#[async_trait]
impl ShortUrlResolver for HttpShortUrlResolver {
    async fn resolve(&self, url: &str) -> String {
        let head_resolved = self.follow(Method::HEAD, url).await;
        if head_resolved != url {
            debug!(url, resolved = %head_resolved, "short link resolved via HEAD");
            return head_resolved;
        }

        // Some shorteners refuse HEAD or answer it without a redirect
        let get_resolved = self.follow(Method::GET, url).await;
        if get_resolved != url {
            debug!(url, resolved = %get_resolved, "short link resolved via GET");
        }
        get_resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn resolver() -> HttpShortUrlResolver {
        HttpShortUrlResolver::new(Duration::from_secs(2), None).unwrap()
    }

    #[test]
    fn test_is_shortener() {
        assert!(is_shortener("https://bit.ly/xyz"));
        assert!(is_shortener("https://T.CO/abc"));
        assert!(is_shortener("http://buff.ly/1"));
        assert!(!is_shortener("https://instagram.com/p/1"));
        assert!(!is_shortener("https://notbit.ly/1"));
        assert!(!is_shortener("bit.ly/xyz"));
    }

    #[tokio::test]
    async fn test_head_redirect_is_followed() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/xyz"))
            .respond_with(
                ResponseTemplate::new(301).insert_header("Location", "/final?ref=short"),
            )
            .mount(&server)
            .await;
        Mock::given(path("/final"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let short = format!("{}/xyz", server.uri());
        let resolved = resolver().resolve(&short).await;
        assert_eq!(resolved, format!("{}/final?ref=short", server.uri()));
    }

    #[tokio::test]
    async fn test_get_fallback_when_head_does_not_redirect() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/abc"))
            .respond_with(ResponseTemplate::new(405))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/abc"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/landing"))
            .mount(&server)
            .await;
        Mock::given(path("/landing"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let short = format!("{}/abc", server.uri());
        let resolved = resolver().resolve(&short).await;
        assert_eq!(resolved, format!("{}/landing", server.uri()));
    }

    #[tokio::test]
    async fn test_unreachable_host_returns_input() {
        let url = "http://127.0.0.1:9/never";
        assert_eq!(resolver().resolve(url).await, url);
    }

    #[tokio::test]
    async fn test_noop_resolver() {
        assert_eq!(NoopResolver.resolve("https://bit.ly/x").await, "https://bit.ly/x");
    }
}
