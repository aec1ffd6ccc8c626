//! Error types for the deep-search crate.
//!
//! Most of these never reach a caller: providers, fetches and deadlines are
//! absorbed into empty lists or empty content at the layer boundary. They
//! exist so each stage can report *why* it degraded before being logged.

/// Errors that can occur inside the search and extraction pipeline.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// An upstream search provider call failed or returned an unusable body.
    #[error("provider error: {0}")]
    Provider(String),

    /// A page fetch failed (connect, status, or body read).
    #[error("fetch error: {0}")]
    Fetch(String),

    /// HTML could not be turned into text by any extraction strategy.
    #[error("parse error: {0}")]
    Parse(String),

    /// An aggregate or watchdog deadline elapsed.
    #[error("deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// An HTTP client could not be built or a request could not be sent.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Invalid configuration or an unrecognised backend name.
    #[error("config error: {0}")]
    Config(String),
}

/// Convenience type alias for deep-search results.
pub type Result<T> = std::result::Result<T, SearchError>;
