//! Trait definition for pluggable search providers, plus the dispatch
//! wrapper that absorbs provider failures.
//!
//! Each provider (keyless DuckDuckGo, keyed Serper) implements
//! [`SearchProvider`]. Providers report errors precisely; [`Provider`]
//! logs them and turns them into empty lists, so callers cannot tell
//! "no results" from "provider down".

use std::future::Future;

use crate::error::SearchError;
use crate::providers::{DuckDuckGoProvider, SerperProvider};
use crate::types::{Backend, NewsCategory, SearchResult};

/// A search backend.
///
/// Implementors issue their own HTTP requests through the per-call client
/// they are handed, and map the upstream response to ordered
/// [`SearchResult`] values in the upstream's native order.
///
/// All implementations must be `Send + Sync`.
pub trait SearchProvider: Send + Sync {
    /// Run a text search and return at most `limit` results.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] if the request fails or the response cannot
    /// be decoded.
    fn search(
        &self,
        client: &reqwest::Client,
        query: &str,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<SearchResult>, SearchError>> + Send;

    /// Fetch at most `limit` news results for `category`.
    ///
    /// # Errors
    ///
    /// Same as [`SearchProvider::search`].
    fn news(
        &self,
        client: &reqwest::Client,
        category: &NewsCategory,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<SearchResult>, SearchError>> + Send;

    /// Which concrete backend this is.
    fn backend(&self) -> Backend;
}

/// A resolved provider for one call.
pub enum Provider {
    Keyless(DuckDuckGoProvider),
    Keyed(SerperProvider),
}

impl Provider {
    pub fn backend(&self) -> Backend {
        match self {
            Self::Keyless(p) => p.backend(),
            Self::Keyed(p) => p.backend(),
        }
    }

    /// Search, logging any failure and returning an empty list instead.
    pub async fn search_or_empty(
        &self,
        client: &reqwest::Client,
        query: &str,
        limit: usize,
    ) -> Vec<SearchResult> {
        let outcome = match self {
            Self::Keyless(p) => p.search(client, query, limit).await,
            Self::Keyed(p) => p.search(client, query, limit).await,
        };
        absorb(self.backend(), outcome, limit)
    }

    /// News, logging any failure and returning an empty list instead.
    pub async fn news_or_empty(
        &self,
        client: &reqwest::Client,
        category: &NewsCategory,
        limit: usize,
    ) -> Vec<SearchResult> {
        let outcome = match self {
            Self::Keyless(p) => p.news(client, category, limit).await,
            Self::Keyed(p) => p.news(client, category, limit).await,
        };
        absorb(self.backend(), outcome, limit)
    }
}

fn absorb(
    backend: Backend,
    outcome: Result<Vec<SearchResult>, SearchError>,
    limit: usize,
) -> Vec<SearchResult> {
    match outcome {
        Ok(mut results) => {
            results.truncate(limit);
            tracing::debug!(%backend, count = results.len(), "provider returned results");
            results
        }
        Err(err) => {
            tracing::warn!(%backend, error = %err, "provider query failed");
            Vec::new()
        }
    }
}
