//! Engine configuration with sensible defaults.
//!
//! [`SearchConfig`] controls cache bounds, fetch and extraction limits,
//! concurrency, deadlines and upstream endpoints. API credentials are not
//! part of it; they come from a [`crate::credentials::CredentialSource`]
//! so that key changes apply on the next call.

use std::time::Duration;

use crate::error::SearchError;

/// Configuration for a [`crate::DeepSearchEngine`].
///
/// Use [`Default::default()`] for sensible defaults, or construct with
/// field overrides for custom behaviour.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Maximum number of URL→text entries held in the content cache.
    pub max_cache_size: usize,
    /// Number of oldest entries removed together when the cache is full.
    pub eviction_batch_size: usize,
    /// Maximum number of memoised URL-validity verdicts.
    pub validity_cache_size: u64,
    /// Maximum number of body bytes read per page.
    pub byte_limit: usize,
    /// Size of each body read; reading stops once `byte_limit` is reached.
    pub chunk_size: usize,
    /// Maximum number of characters of extracted text per page.
    pub text_limit: usize,
    /// Maximum number of paragraph-like elements read per page.
    pub max_paragraphs: usize,
    /// Concurrency headroom multiplier applied to `k`.
    pub concurrency_factor: usize,
    /// Hard upper bound on concurrent page fetches.
    pub concurrency_cap: usize,
    /// Aggregate deadline for one deep-search batch.
    pub deep_search_deadline: Duration,
    /// Outer deadline enforced by the facade. Must exceed `deep_search_deadline`.
    pub watchdog_timeout: Duration,
    /// Per-request timeout for provider and page requests.
    pub request_timeout: Duration,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Idle keep-alive connections retained per host within one pool.
    pub pool_idle_per_host: usize,
    /// Custom User-Agent string. If `None`, rotates through a built-in list
    /// of realistic browser User-Agents.
    pub user_agent: Option<String>,
    /// Keyless (DuckDuckGo HTML) search endpoint.
    pub keyless_endpoint: String,
    /// Keyed (Serper) API base URL, without a trailing path.
    pub keyed_endpoint: String,
    /// Whether the engine warms connections in the background at construction.
    pub warm_up: bool,
    /// URLs touched by the warm-up worker.
    pub warm_up_urls: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_cache_size: 500,
            eviction_batch_size: 50,
            validity_cache_size: 2048,
            byte_limit: 64 * 1024,
            chunk_size: 8 * 1024,
            text_limit: 2000,
            max_paragraphs: 40,
            concurrency_factor: 8,
            concurrency_cap: 150,
            deep_search_deadline: Duration::from_millis(1200),
            watchdog_timeout: Duration::from_millis(2200),
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(2),
            pool_idle_per_host: 8,
            user_agent: None,
            keyless_endpoint: "https://html.duckduckgo.com/html/".into(),
            keyed_endpoint: "https://google.serper.dev".into(),
            warm_up: true,
            warm_up_urls: vec![
                "https://html.duckduckgo.com/".into(),
                "https://google.serper.dev/".into(),
            ],
        }
    }
}

impl SearchConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - sizes, limits and timeouts must be greater than 0
    /// - `eviction_batch_size` must be <= `max_cache_size`
    /// - `chunk_size` must be <= `byte_limit`
    /// - `watchdog_timeout` must be > `deep_search_deadline`
    pub fn validate(&self) -> Result<(), SearchError> {
        let positive = [
            ("max_cache_size", self.max_cache_size),
            ("eviction_batch_size", self.eviction_batch_size),
            ("byte_limit", self.byte_limit),
            ("chunk_size", self.chunk_size),
            ("text_limit", self.text_limit),
            ("max_paragraphs", self.max_paragraphs),
            ("concurrency_factor", self.concurrency_factor),
            ("concurrency_cap", self.concurrency_cap),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(SearchError::Config(format!(
                    "{name} must be greater than 0"
                )));
            }
        }
        if self.validity_cache_size == 0 {
            return Err(SearchError::Config(
                "validity_cache_size must be greater than 0".into(),
            ));
        }
        for (name, value) in [
            ("deep_search_deadline", self.deep_search_deadline),
            ("request_timeout", self.request_timeout),
            ("connect_timeout", self.connect_timeout),
        ] {
            if value.is_zero() {
                return Err(SearchError::Config(format!(
                    "{name} must be greater than 0"
                )));
            }
        }
        if self.eviction_batch_size > self.max_cache_size {
            return Err(SearchError::Config(
                "eviction_batch_size must be <= max_cache_size".into(),
            ));
        }
        if self.chunk_size > self.byte_limit {
            return Err(SearchError::Config(
                "chunk_size must be <= byte_limit".into(),
            ));
        }
        if self.watchdog_timeout <= self.deep_search_deadline {
            return Err(SearchError::Config(
                "watchdog_timeout must be greater than deep_search_deadline".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sensible_values() {
        let config = SearchConfig::default();
        assert_eq!(config.max_cache_size, 500);
        assert_eq!(config.eviction_batch_size, 50);
        assert_eq!(config.byte_limit, 65_536);
        assert_eq!(config.text_limit, 2000);
        assert_eq!(config.deep_search_deadline, Duration::from_millis(1200));
        assert_eq!(config.watchdog_timeout, Duration::from_millis(2200));
        assert!(config.user_agent.is_none());
        assert!(config.warm_up);
    }

    #[test]
    fn valid_config_passes_validation() {
        assert!(SearchConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_text_limit_rejected() {
        let config = SearchConfig {
            text_limit: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("text_limit"));
    }

    #[test]
    fn zero_deadline_rejected() {
        let config = SearchConfig {
            deep_search_deadline: Duration::ZERO,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("deep_search_deadline"));
    }

    #[test]
    fn eviction_batch_larger_than_cache_rejected() {
        let config = SearchConfig {
            max_cache_size: 10,
            eviction_batch_size: 11,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("eviction_batch_size"));
    }

    #[test]
    fn chunk_larger_than_byte_limit_rejected() {
        let config = SearchConfig {
            byte_limit: 1024,
            chunk_size: 4096,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("chunk_size"));
    }

    #[test]
    fn watchdog_must_exceed_deadline() {
        let config = SearchConfig {
            deep_search_deadline: Duration::from_secs(2),
            watchdog_timeout: Duration::from_secs(2),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("watchdog_timeout"));
    }

    #[test]
    fn custom_user_agent() {
        let config = SearchConfig {
            user_agent: Some("CustomBot/1.0".into()),
            ..Default::default()
        };
        assert_eq!(config.user_agent.as_deref(), Some("CustomBot/1.0"));
        assert!(config.validate().is_ok());
    }
}
