//! Keyed provider: the Serper Google Search API.
//!
//! `POST {endpoint}/search` and `POST {endpoint}/news` with a JSON body
//! `{"q": ..., "num": ...}` and the key in `X-API-KEY`. Organic results are
//! preferred; when a response has none, a knowledge-graph panel or an
//! answer box is mapped to a single result instead.

use serde::Deserialize;
use serde_json::json;

use crate::error::SearchError;
use crate::provider::SearchProvider;
use crate::types::{Backend, NewsCategory, SearchResult};

/// Largest `num` the API accepts.
pub const MAX_RESULTS: usize = 100;

/// Serper API client. The key is captured at construction.
#[derive(Clone)]
pub struct SerperProvider {
    endpoint: String,
    api_key: String,
}

impl std::fmt::Debug for SerperProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerperProvider")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    organic: Vec<OrganicResult>,
    knowledge_graph: Option<KnowledgeGraph>,
    answer_box: Option<AnswerBox>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KnowledgeGraph {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    website: Option<String>,
    description_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnswerBox {
    #[serde(default)]
    title: String,
    answer: Option<String>,
    snippet: Option<String>,
    link: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    news: Vec<OrganicResult>,
}

impl SerperProvider {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.endpoint.trim_end_matches('/'))
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        client: &reqwest::Client,
        path: &str,
        query: &str,
        limit: usize,
    ) -> Result<T, SearchError> {
        let num = limit.clamp(1, MAX_RESULTS);
        client
            .post(self.url(path))
            .header("X-API-KEY", &self.api_key)
            .json(&json!({ "q": query, "num": num }))
            .send()
            .await
            .map_err(|e| SearchError::Provider(format!("Serper request failed: {e}")))?
            .error_for_status()
            .map_err(|e| SearchError::Provider(format!("Serper HTTP error: {e}")))?
            .json::<T>()
            .await
            .map_err(|e| SearchError::Provider(format!("Serper response decode failed: {e}")))
    }
}

impl SearchProvider for SerperProvider {
    async fn search(
        &self,
        client: &reqwest::Client,
        query: &str,
        limit: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        tracing::trace!(query, "Serper search");
        let response: SearchResponse = self.post(client, "search", query, limit).await?;
        Ok(map_search_response(response, limit))
    }

    async fn news(
        &self,
        client: &reqwest::Client,
        category: &NewsCategory,
        limit: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        tracing::trace!(query = category.query(), "Serper news");
        let response: NewsResponse = self.post(client, "news", category.query(), limit).await?;
        Ok(map_organic(response.news, limit))
    }

    fn backend(&self) -> Backend {
        Backend::Keyed
    }
}

fn map_search_response(response: SearchResponse, limit: usize) -> Vec<SearchResult> {
    if !response.organic.is_empty() {
        return map_organic(response.organic, limit);
    }
    if let Some(kg) = response.knowledge_graph {
        let link = kg.website.or(kg.description_link).unwrap_or_default();
        return vec![SearchResult::new(kg.title, link, kg.description)];
    }
    if let Some(answer) = response.answer_box {
        let snippet = answer.answer.or(answer.snippet).unwrap_or_default();
        return vec![SearchResult::new(
            answer.title,
            answer.link.unwrap_or_default(),
            snippet,
        )];
    }
    Vec::new()
}

fn map_organic(items: Vec<OrganicResult>, limit: usize) -> Vec<SearchResult> {
    let mut results: Vec<SearchResult> = Vec::with_capacity(items.len().min(limit));
    for item in items {
        if results.len() >= limit {
            break;
        }
        if item.link.is_empty() || results.iter().any(|r| r.link == item.link) {
            continue;
        }
        let mut result = SearchResult::new(item.title, item.link, item.snippet);
        result.date = item.date;
        results.push(result);
    }
    results
}
