//! Core types: search results, backend selection, news categories and
//! search requests.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SearchError;

/// Default number of results requested by [`SearchRequest::new`].
pub const DEFAULT_K: usize = 6;

/// A single search result, optionally enriched with page content.
///
/// `link` identifies the result within one batch. `full_content` is `None`
/// until a deep search visits the result; after that it holds the extracted
/// text, or an empty string when extraction failed or ran out of time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// The title of the result page.
    pub title: String,
    /// The URL of the result page.
    pub link: String,
    /// Provider-supplied summary text.
    pub snippet: String,
    /// Extracted article text, set by deep search.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_content: Option<String>,
    /// Publication date as reported by the provider (news only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl SearchResult {
    /// Create a result with no content and no date.
    pub fn new(
        title: impl Into<String>,
        link: impl Into<String>,
        snippet: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            snippet: snippet.into(),
            full_content: None,
            date: None,
        }
    }

    /// Extracted content, or `""` when none was attached.
    pub fn content(&self) -> &str {
        self.full_content.as_deref().unwrap_or_default()
    }
}

/// Which search provider to use for a call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Keyed provider when credentials are present, keyless otherwise.
    #[default]
    Auto,
    /// DuckDuckGo HTML search, no credentials required.
    Keyless,
    /// Serper search API, requires an API key.
    Keyed,
}

impl Backend {
    /// Returns the canonical lowercase name of this backend.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Keyless => "keyless",
            Self::Keyed => "keyed",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Backend {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "keyless" | "duckduckgo" => Ok(Self::Keyless),
            "keyed" | "serper" => Ok(Self::Keyed),
            other => Err(SearchError::Config(format!("unknown backend: {other}"))),
        }
    }
}

/// A news feed category, mapped to a fixed canned query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NewsCategory {
    Technology,
    Finance,
    Entertainment,
    Sports,
    World,
    Health,
    /// Any unrecognised category; searches generic latest news.
    Other(String),
}

impl NewsCategory {
    /// Parse a category name. Unknown names become [`NewsCategory::Other`].
    pub fn parse(category: &str) -> Self {
        match category.trim().to_ascii_lowercase().as_str() {
            "technology" => Self::Technology,
            "finance" => Self::Finance,
            "entertainment" => Self::Entertainment,
            "sports" => Self::Sports,
            "world" => Self::World,
            "health" => Self::Health,
            _ => Self::Other(category.to_owned()),
        }
    }

    /// The query string issued for this category.
    pub fn query(&self) -> &'static str {
        match self {
            Self::Technology => "latest technology news",
            Self::Finance => "latest finance and markets news",
            Self::Entertainment => "latest entertainment news",
            Self::Sports => "latest sports news",
            Self::World => "latest world news",
            Self::Health => "latest health news",
            Self::Other(_) => "latest news",
        }
    }
}

/// Parameters for one [`crate::DeepSearchEngine::search`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    /// Number of results to fetch and, with deep search, to enrich.
    pub k: usize,
    pub backend: Backend,
    /// Whether to fetch page content for the returned results.
    pub deep_search: bool,
}

impl SearchRequest {
    /// A request with `k = 6`, automatic backend and deep search enabled.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            k: DEFAULT_K,
            backend: Backend::Auto,
            deep_search: true,
        }
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_deep_search(mut self, deep_search: bool) -> Self {
        self.deep_search = deep_search;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_result_has_no_content() {
        let result = SearchResult::new("Example", "https://example.com", "An example page");
        assert_eq!(result.title, "Example");
        assert!(result.full_content.is_none());
        assert_eq!(result.content(), "");
    }

    #[test]
    fn result_serialises_external_field_names() {
        let mut result = SearchResult::new("T", "https://t.com", "s");
        result.full_content = Some("body".into());
        let json = serde_json::to_value(&result).expect("serialize");
        assert_eq!(json["fullContent"], "body");
        assert!(json.get("date").is_none());
    }

    #[test]
    fn unset_content_is_omitted() {
        let result = SearchResult::new("T", "https://t.com", "s");
        let json = serde_json::to_value(&result).expect("serialize");
        assert!(json.get("fullContent").is_none());
    }

    #[test]
    fn backend_parses_names_and_aliases() {
        assert_eq!("auto".parse::<Backend>().ok(), Some(Backend::Auto));
        assert_eq!("Keyless".parse::<Backend>().ok(), Some(Backend::Keyless));
        assert_eq!("duckduckgo".parse::<Backend>().ok(), Some(Backend::Keyless));
        assert_eq!(" keyed ".parse::<Backend>().ok(), Some(Backend::Keyed));
        assert_eq!("serper".parse::<Backend>().ok(), Some(Backend::Keyed));
    }

    #[test]
    fn unknown_backend_is_config_error() {
        let err = "bing".parse::<Backend>().unwrap_err();
        assert!(matches!(err, SearchError::Config(_)));
        assert!(err.to_string().contains("bing"));
    }

    #[test]
    fn backend_display_round_trips() {
        for backend in [Backend::Auto, Backend::Keyless, Backend::Keyed] {
            assert_eq!(backend.to_string().parse::<Backend>().ok(), Some(backend));
        }
    }

    #[test]
    fn known_categories_map_to_canned_queries() {
        assert_eq!(NewsCategory::parse("technology"), NewsCategory::Technology);
        assert_eq!(NewsCategory::parse("HEALTH"), NewsCategory::Health);
        assert_eq!(
            NewsCategory::Technology.query(),
            "latest technology news"
        );
        assert_eq!(NewsCategory::Sports.query(), "latest sports news");
    }

    #[test]
    fn unknown_category_maps_to_latest_news() {
        let category = NewsCategory::parse("gardening");
        assert_eq!(category, NewsCategory::Other("gardening".into()));
        assert_eq!(category.query(), "latest news");
    }

    #[test]
    fn request_defaults() {
        let request = SearchRequest::new("rust ownership");
        assert_eq!(request.k, 6);
        assert_eq!(request.backend, Backend::Auto);
        assert!(request.deep_search);

        let request = request
            .with_k(3)
            .with_backend(Backend::Keyless)
            .with_deep_search(false);
        assert_eq!(request.k, 3);
        assert_eq!(request.backend, Backend::Keyless);
        assert!(!request.deep_search);
    }
}
