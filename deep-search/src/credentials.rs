//! Sources of API credentials for the keyed provider.
//!
//! Credentials are looked up on every call rather than cached, so a key
//! added or removed at runtime takes effect on the next search.

use std::env;

/// Environment variable read by [`EnvCredentials::default`].
pub const SERPER_API_KEY_VAR: &str = "SERPER_API_KEY";

/// Supplies an optional Serper API key.
pub trait CredentialSource: Send + Sync {
    /// The current key, or `None` when unset. Blank keys count as unset.
    fn serper_api_key(&self) -> Option<String>;
}

/// Reads the key from an environment variable on each lookup.
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    var: String,
}

impl EnvCredentials {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvCredentials {
    fn default() -> Self {
        Self::new(SERPER_API_KEY_VAR)
    }
}

impl CredentialSource for EnvCredentials {
    fn serper_api_key(&self) -> Option<String> {
        non_blank(env::var(&self.var).ok())
    }
}

/// A fixed key, mainly for embedding and tests.
#[derive(Clone, Default)]
pub struct StaticCredentials {
    key: Option<String>,
}

impl StaticCredentials {
    pub fn new(key: Option<String>) -> Self {
        Self { key }
    }

    pub fn none() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl CredentialSource for StaticCredentials {
    fn serper_api_key(&self) -> Option<String> {
        non_blank(self.key.clone())
    }
}

fn non_blank(key: Option<String>) -> Option<String> {
    key.map(|k| k.trim().to_owned()).filter(|k| !k.is_empty())
}
