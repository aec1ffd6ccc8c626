//! Fetch-and-extract for a single URL.
//!
//! [`ContentExtractor::extract`] never fails: every problem collapses to an
//! empty string. Each outcome is recorded in the [`CacheStore`] so the same
//! URL is never fetched twice in one engine lifetime (text is served from the
//! content cache; failures short-circuit through the failed-URL set).

use std::sync::Arc;

use reqwest::header::LOCATION;
use reqwest::StatusCode;
use url::Url;

use crate::cache::CacheStore;
use crate::content::{extract_text, TextLimits};
use crate::error::{Result, SearchError};

/// Redirect targets at least this long are treated as malformed.
pub const MAX_LOCATION_LEN: usize = 200;

/// Fetches capped page bodies and extracts paragraph text.
#[derive(Clone)]
pub struct ContentExtractor {
    client: reqwest::Client,
    cache: Arc<CacheStore>,
    chunk_size: usize,
    max_paragraphs: usize,
}

impl ContentExtractor {
    /// Create an extractor over a pool's client.
    ///
    /// The client must have automatic redirects disabled; see
    /// [`crate::http::ConnectionPool`].
    pub fn new(
        client: reqwest::Client,
        cache: Arc<CacheStore>,
        chunk_size: usize,
        max_paragraphs: usize,
    ) -> Self {
        Self {
            client,
            cache,
            chunk_size: chunk_size.max(1),
            max_paragraphs: max_paragraphs.max(1),
        }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Fetch at most `byte_limit` bytes of `url` and return up to
    /// `text_limit` characters of its text, or `""` on any failure.
    ///
    /// Invalid and previously failed URLs return `""` without a request.
    pub async fn extract(&self, url: &str, byte_limit: usize, text_limit: usize) -> String {
        if !self.cache.is_eligible(url) {
            tracing::trace!(url = %url, "skipping ineligible url");
            return String::new();
        }
        if let Some(text) = self.cache.get_content(url) {
            tracing::trace!(url = %url, "content cache hit");
            return text;
        }

        let limits = TextLimits {
            text_limit,
            max_paragraphs: self.max_paragraphs,
        };
        let outcome = match self.fetch_capped(url, byte_limit).await {
            Ok(body) => extract_text(&String::from_utf8_lossy(&body), limits),
            Err(err) => Err(err),
        };

        match outcome {
            Ok(text) => {
                tracing::trace!(url = %url, chars = text.chars().count(), "page extracted");
                self.cache.insert_content(url, text.clone());
                text
            }
            Err(err) => {
                tracing::debug!(url = %url, error = %err, "page extraction failed");
                self.cache.mark_failed(url);
                String::new()
            }
        }
    }

    /// GET `url`, following one short 301/302 hop, and read the body in
    /// chunks until `byte_limit` bytes are buffered.
    async fn fetch_capped(&self, url: &str, byte_limit: usize) -> Result<Vec<u8>> {
        let mut response = self.get(url).await?;

        if matches!(
            response.status(),
            StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND
        ) {
            let target = redirect_target(url, &response)?;
            if !self.cache.is_valid_url(&target) {
                return Err(SearchError::Fetch(format!(
                    "redirect to unfetchable url: {target}"
                )));
            }
            tracing::trace!(from = %url, to = %target, "following redirect");
            response = self.get(&target).await?;
        }

        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            return Err(SearchError::Fetch(
                "access forbidden (403), possible bot detection".into(),
            ));
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SearchError::Fetch("rate limited (429)".into()));
        }
        if !status.is_success() {
            return Err(SearchError::Fetch(format!("status code {status}")));
        }

        let mut body = Vec::with_capacity(byte_limit.min(self.chunk_size * 2));
        while body.len() < byte_limit {
            let chunk = response
                .chunk()
                .await
                .map_err(|e| SearchError::Fetch(format!("body read failed: {e}")))?;
            let Some(chunk) = chunk else {
                break;
            };
            // Network chunks arrive in whatever size the transport chose;
            // consume them in `chunk_size` slices so the cap is exact.
            for slice in chunk.chunks(self.chunk_size) {
                let room = byte_limit - body.len();
                body.extend_from_slice(&slice[..slice.len().min(room)]);
                if body.len() >= byte_limit {
                    break;
                }
            }
        }
        Ok(body)
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        self.client
            .get(url)
            .send()
            .await
            .map_err(|e| SearchError::Fetch(format!("request failed: {e}")))
    }
}

/// Resolve the `Location` header of a redirect against the request URL.
fn redirect_target(url: &str, response: &reqwest::Response) -> Result<String> {
    let location = response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| SearchError::Fetch("redirect without usable Location".into()))?;
    if location.len() >= MAX_LOCATION_LEN {
        return Err(SearchError::Fetch(format!(
            "redirect Location too long ({} chars)",
            location.len()
        )));
    }
    let base = Url::parse(url).map_err(|e| SearchError::Fetch(format!("bad url: {e}")))?;
    base.join(location)
        .map(String::from)
        .map_err(|e| SearchError::Fetch(format!("bad redirect Location: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use crate::http::ConnectionPool;

    fn extractor(cache: Arc<CacheStore>) -> ContentExtractor {
        let pool = ConnectionPool::open(&SearchConfig::default(), Arc::default())
            .expect("pool should open");
        ContentExtractor::new(pool.client().clone(), cache, 1024, 40)
    }

    #[tokio::test]
    async fn invalid_url_returns_empty_without_marking() {
        let cache = Arc::new(CacheStore::new(10, 1, 64));
        let text = extractor(Arc::clone(&cache))
            .extract("not a url", 1024, 100)
            .await;
        assert!(text.is_empty());
        // Invalid URLs are rejected by validation, not recorded as failures.
        assert_eq!(cache.stats().failed_urls, 0);
    }

    #[tokio::test]
    async fn failed_url_returns_empty() {
        let cache = Arc::new(CacheStore::new(10, 1, 64));
        cache.mark_failed("https://down.example.com/");
        let text = extractor(Arc::clone(&cache))
            .extract("https://down.example.com/", 1024, 100)
            .await;
        assert!(text.is_empty());
    }

    #[tokio::test]
    async fn cached_content_served_without_fetch() {
        let cache = Arc::new(CacheStore::new(10, 1, 64));
        // .invalid never resolves, so any network attempt would fail.
        cache.insert_content("https://cached.invalid/", "cached text".into());
        let text = extractor(Arc::clone(&cache))
            .extract("https://cached.invalid/", 1024, 100)
            .await;
        assert_eq!(text, "cached text");
        assert_eq!(cache.stats().failed_urls, 0);
    }

    #[test]
    fn extractor_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ContentExtractor>();
    }
}
