//! # deep-search
//!
//! Embedded web search with bounded-latency deep content extraction.
//!
//! A call asks a search provider for results, then (optionally) fetches
//! the top `k` result pages concurrently, extracts readable text, and
//! attaches it to each result. Everything is bounded: bytes read per page,
//! characters of text kept, concurrent fetches, and total wall-clock time.
//!
//! ## Design
//!
//! - Two providers: keyless DuckDuckGo HTML scraping and the keyed Serper API
//! - Backend choice is re-evaluated on every call from live credentials
//! - Bounded content cache with batch eviction, plus a failed-URL set
//! - A fresh connection pool per call, with a shared DNS cache
//! - Deep search is abandoned at its deadline; a watchdog guards the call
//! - Graceful degradation: failures produce empty lists or empty content,
//!   never errors
//!
//! ## Security
//!
//! - API keys are read per call and redacted from `Debug` output
//! - No network listeners; this is a library, not a server
//! - Search queries are logged only at trace level
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use deep_search::{DeepSearchEngine, EnvCredentials, SearchConfig, SearchRequest};
//!
//! # fn example() -> deep_search::Result<()> {
//! let credentials = Arc::new(EnvCredentials::default());
//! let engine = DeepSearchEngine::new(SearchConfig::default(), credentials)?;
//! let results = engine.search_blocking(&SearchRequest::new("rust ownership").with_k(3));
//! for result in &results {
//!     println!("{}: {} chars", result.link, result.content().len());
//! }
//! engine.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod content;
pub mod credentials;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod http;
pub mod orchestrator;
pub mod provider;
pub mod providers;
pub mod selector;
pub mod types;
pub mod url_validator;

pub use cache::{CacheStats, CacheStore};
pub use config::SearchConfig;
pub use credentials::{CredentialSource, EnvCredentials, StaticCredentials};
pub use engine::{CallPhase, DeepSearchEngine};
pub use error::{Result, SearchError};
pub use provider::{Provider, SearchProvider};
pub use types::{Backend, NewsCategory, SearchRequest, SearchResult};
