//! Search provider implementations.
//!
//! Each module provides a struct implementing [`crate::provider::SearchProvider`].

pub mod duckduckgo;
pub mod serper;

pub use duckduckgo::DuckDuckGoProvider;
pub use serper::SerperProvider;
