//! Backend resolution.
//!
//! Resolution is a pure function of the requested [`Backend`] and whether a
//! key is present right now. It runs on every call.

use crate::config::SearchConfig;
use crate::credentials::CredentialSource;
use crate::provider::Provider;
use crate::providers::{DuckDuckGoProvider, SerperProvider};
use crate::types::Backend;

/// Picks the concrete provider for a call.
pub struct BackendSelector<'a> {
    config: &'a SearchConfig,
    credentials: &'a dyn CredentialSource,
}

impl<'a> BackendSelector<'a> {
    pub fn new(config: &'a SearchConfig, credentials: &'a dyn CredentialSource) -> Self {
        Self {
            config,
            credentials,
        }
    }

    /// Resolve `requested` to a provider.
    ///
    /// `Auto` picks the keyed provider when a key is configured. An explicit
    /// `Keyed` request without a key is downgraded to keyless with an info
    /// log; it is never an error.
    pub fn resolve(&self, requested: Backend) -> Provider {
        let key = self.credentials.serper_api_key();
        match (requested, key) {
            (Backend::Auto | Backend::Keyed, Some(key)) => {
                Provider::Keyed(SerperProvider::new(&self.config.keyed_endpoint, key))
            }
            (Backend::Keyed, None) => {
                tracing::info!("keyed backend requested without credentials, using keyless");
                self.keyless()
            }
            (Backend::Auto | Backend::Keyless, _) => self.keyless(),
        }
    }

    fn keyless(&self) -> Provider {
        Provider::Keyless(DuckDuckGoProvider::new(&self.config.keyless_endpoint))
    }
}
