//! Per-call HTTP connection pools with a shared DNS cache.
//!
//! A [`ConnectionPool`] wraps a [`reqwest::Client`] configured for
//! keep-alive, browser-like headers, rotating User-Agents and no automatic
//! redirects. One pool is opened inside each pipeline worker and closed
//! before the worker exits, so connections never cross runtimes.
//!
//! Hostname lookups go through a [`DnsCache`] owned by the engine, which
//! outlives individual pools. That is what lets the warm-up worker hide
//! resolution latency from the first real call.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use rand::seq::SliceRandom;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};

use crate::config::SearchConfig;
use crate::error::SearchError;

/// Realistic browser User-Agent strings, one picked per pool.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
];

/// How long a resolved hostname is reused.
pub const DNS_TTL: Duration = Duration::from_secs(300);

/// Most hostnames kept in a [`DnsCache`].
pub const DNS_CACHE_CAPACITY: u64 = 1024;

const IDLE_TIMEOUT: Duration = Duration::from_secs(30);
const TCP_KEEPALIVE: Duration = Duration::from_secs(30);

type BoxError = Box<dyn std::error::Error + Send + Sync>;

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

/// Select a random User-Agent string from the rotation list.
pub fn random_user_agent() -> &'static str {
    let mut rng = rand::thread_rng();
    USER_AGENTS
        .choose(&mut rng)
        .copied()
        // SAFETY: USER_AGENTS is a non-empty const array, choose only returns None on empty slices
        .unwrap_or(USER_AGENTS[0])
}

/// Hostname → socket address cache with a fixed TTL.
#[derive(Debug, Clone)]
pub struct DnsCache {
    entries: Cache<String, Vec<SocketAddr>>,
}

impl Default for DnsCache {
    fn default() -> Self {
        Self::new(DNS_TTL, DNS_CACHE_CAPACITY)
    }
}

impl DnsCache {
    /// Create a cache holding at most `capacity` hosts for `ttl` each.
    pub fn new(ttl: Duration, capacity: u64) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Unexpired addresses for `host`, if cached.
    pub fn get(&self, host: &str) -> Option<Vec<SocketAddr>> {
        self.entries.get(host)
    }

    pub fn insert(&self, host: &str, addrs: Vec<SocketAddr>) {
        if addrs.is_empty() {
            return;
        }
        self.entries.insert(host.to_owned(), addrs);
    }

    pub fn clear(&self) {
        self.entries.invalidate_all();
    }

    /// Number of live hosts, after pending evictions are applied.
    pub fn len(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// reqwest resolver consulting a [`DnsCache`] before the system resolver.
struct CachingResolver {
    cache: Arc<DnsCache>,
}

impl Resolve for CachingResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let cache = Arc::clone(&self.cache);
        Box::pin(async move {
            let host = name.as_str().to_owned();
            if let Some(addrs) = cache.get(&host) {
                tracing::trace!(host = %host, "dns cache hit");
                let addrs: Addrs = Box::new(addrs.into_iter());
                return Ok::<Addrs, BoxError>(addrs);
            }
            // Port 0: the connector substitutes the request's port.
            let resolved: Vec<SocketAddr> =
                tokio::net::lookup_host((host.as_str(), 0)).await?.collect();
            tracing::trace!(host = %host, count = resolved.len(), "dns resolved");
            cache.insert(&host, resolved.clone());
            let addrs: Addrs = Box::new(resolved.into_iter());
            Ok::<Addrs, BoxError>(addrs)
        })
    }
}

/// A pool of keep-alive connections scoped to one pipeline invocation.
pub struct ConnectionPool {
    client: reqwest::Client,
    id: u64,
}

impl ConnectionPool {
    /// Open a pool configured from `config`, resolving through `dns`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Http`] if the client cannot be constructed.
    pub fn open(config: &SearchConfig, dns: Arc<DnsCache>) -> Result<Self, SearchError> {
        let ua = match config.user_agent {
            Some(ref custom) => custom.clone(),
            None => random_user_agent().to_owned(),
        };

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = reqwest::Client::builder()
            .user_agent(ua)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::none())
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool_idle_per_host)
            .pool_idle_timeout(IDLE_TIMEOUT)
            .tcp_keepalive(TCP_KEEPALIVE)
            .tcp_nodelay(true)
            .dns_resolver(Arc::new(CachingResolver { cache: dns }))
            .build()
            .map_err(|e| SearchError::Http(format!("failed to build HTTP client: {e}")))?;

        let id = NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(pool = id, "connection pool opened");
        Ok(Self { client, id })
    }

    /// The pooled client. Cloning it shares the same connections.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Release every pooled connection.
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for ConnectionPool {
    fn drop(&mut self) {
        tracing::trace!(pool = self.id, "connection pool closed");
    }
}
