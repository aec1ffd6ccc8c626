//! The caller-facing search engine.
//!
//! [`DeepSearchEngine`] owns the caches, the DNS cache and the credential
//! source. Every call runs on a dedicated worker thread with its own
//! current-thread tokio runtime and its own [`ConnectionPool`], so the
//! caller's execution context never matters: plain threads use the
//! `*_blocking` methods, async code awaits [`DeepSearchEngine::search`].
//!
//! The worker reports the raw provider results as soon as they arrive and
//! the final results when done. The caller waits under a watchdog that is
//! strictly longer than the deep-search deadline; if it fires, the caller
//! gets the raw results (or nothing, if the provider had not answered yet).
//!
//! # Call phases
//!
//! ```text
//! Idle → BackendResolved → RawResultsFetched → DeepSearchRunning ─┐
//!                                           └→ Skipped ───────────┴→ Completed
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::cache::{CacheStats, CacheStore};
use crate::config::SearchConfig;
use crate::credentials::CredentialSource;
use crate::error::{Result, SearchError};
use crate::extractor::ContentExtractor;
use crate::http::{ConnectionPool, DnsCache};
use crate::orchestrator::DeepSearchOrchestrator;
use crate::selector::BackendSelector;
use crate::types::{Backend, NewsCategory, SearchRequest, SearchResult};

/// Number of results requested for a news category.
pub const NEWS_LIMIT: usize = 10;

/// Warm-up touches at most this many URLs.
const WARM_UP_CONNECTIONS: usize = 2;

/// Where a call is in its lifecycle. Logged at trace level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPhase {
    Idle,
    BackendResolved,
    RawResultsFetched,
    DeepSearchRunning,
    Skipped,
    Completed,
}

fn enter(phase: CallPhase) {
    tracing::trace!(?phase, "call phase");
}

enum Job {
    Search(SearchRequest),
    News(NewsCategory, Backend),
}

impl Job {
    fn backend(&self) -> Backend {
        match self {
            Self::Search(request) => request.backend,
            Self::News(_, backend) => *backend,
        }
    }
}

enum PipelineEvent {
    RawFetched(Vec<SearchResult>),
    Completed(Vec<SearchResult>),
}

type Sink = Box<dyn Fn(PipelineEvent) + Send>;

/// Everything a worker needs, cheap to clone into a thread.
#[derive(Clone)]
struct PipelineContext {
    config: Arc<SearchConfig>,
    cache: Arc<CacheStore>,
    dns: Arc<DnsCache>,
    credentials: Arc<dyn CredentialSource>,
}

/// Web search with deep content extraction under a latency budget.
pub struct DeepSearchEngine {
    ctx: PipelineContext,
    workers: Mutex<Vec<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl DeepSearchEngine {
    /// Build an engine and start the background warm-up (if enabled).
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if `config` fails validation.
    pub fn new(config: SearchConfig, credentials: Arc<dyn CredentialSource>) -> Result<Self> {
        config.validate()?;
        let engine = Self {
            ctx: PipelineContext {
                cache: Arc::new(CacheStore::from_config(&config)),
                dns: Arc::new(DnsCache::default()),
                config: Arc::new(config),
                credentials,
            },
            workers: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        };
        if engine.ctx.config.warm_up {
            engine.start_warm_up();
        }
        Ok(engine)
    }

    pub fn config(&self) -> &SearchConfig {
        &self.ctx.config
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.ctx.cache.stats()
    }

    /// Search and, if requested, deep-search the results.
    ///
    /// Never fails: provider errors yield `vec![]`, page failures yield
    /// empty content, and a watchdog expiry yields the raw results.
    pub async fn search(&self, request: &SearchRequest) -> Vec<SearchResult> {
        if self.rejects(request.k) {
            return Vec::new();
        }
        self.run_async(Job::Search(request.clone())).await
    }

    /// Blocking form of [`DeepSearchEngine::search`], callable from any thread,
    /// including from inside another runtime's blocking section.
    pub fn search_blocking(&self, request: &SearchRequest) -> Vec<SearchResult> {
        if self.rejects(request.k) {
            return Vec::new();
        }
        self.run_blocking(Job::Search(request.clone()))
    }

    /// Latest news for `category`. Never deep-searched.
    pub async fn news(&self, category: &str, backend: Backend) -> Vec<SearchResult> {
        if self.rejects(NEWS_LIMIT) {
            return Vec::new();
        }
        self.run_async(Job::News(NewsCategory::parse(category), backend))
            .await
    }

    /// Blocking form of [`DeepSearchEngine::news`].
    pub fn news_blocking(&self, category: &str, backend: Backend) -> Vec<SearchResult> {
        if self.rejects(NEWS_LIMIT) {
            return Vec::new();
        }
        self.run_blocking(Job::News(NewsCategory::parse(category), backend))
    }

    /// Forget cached content, failed URLs and URL-validity verdicts.
    pub fn clear_cache(&self) {
        self.ctx.cache.clear();
        tracing::debug!("caches cleared");
    }

    /// Stop accepting calls and wait for every background worker to exit.
    ///
    /// Workers finish within their own deadlines; their pools close as they
    /// exit. Calls made after shutdown return empty lists.
    pub fn shutdown(&self) {
        let handles = {
            let mut workers = self.lock_workers();
            if self.closed.swap(true, Ordering::SeqCst) {
                return;
            }
            std::mem::take(&mut *workers)
        };
        let count = handles.len();
        for handle in handles {
            if handle.join().is_err() {
                tracing::warn!("search worker panicked");
            }
        }
        self.ctx.dns.clear();
        tracing::debug!(workers = count, "search engine shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn rejects(&self, k: usize) -> bool {
        if self.is_shut_down() {
            tracing::debug!("call after shutdown ignored");
            return true;
        }
        k == 0
    }

    fn run_blocking(&self, job: Job) -> Vec<SearchResult> {
        let (tx, rx) = mpsc::channel();
        let sink: Sink = Box::new(move |event| {
            let _ = tx.send(event);
        });
        if !self.spawn_worker(job, sink) {
            return Vec::new();
        }

        let deadline = Instant::now() + self.ctx.config.watchdog_timeout;
        let mut snapshot = Vec::new();
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok(PipelineEvent::RawFetched(raw)) => snapshot = raw,
                Ok(PipelineEvent::Completed(results)) => return results,
                Err(RecvTimeoutError::Timeout) => {
                    self.log_watchdog(snapshot.len());
                    return snapshot;
                }
                Err(RecvTimeoutError::Disconnected) => return snapshot,
            }
        }
    }

    async fn run_async(&self, job: Job) -> Vec<SearchResult> {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let sink: Sink = Box::new(move |event| {
            let _ = tx.send(event);
        });
        if !self.spawn_worker(job, sink) {
            return Vec::new();
        }

        let deadline = tokio::time::Instant::now() + self.ctx.config.watchdog_timeout;
        let mut snapshot = Vec::new();
        loop {
            match tokio::time::timeout_at(deadline, rx.recv()).await {
                Ok(Some(PipelineEvent::RawFetched(raw))) => snapshot = raw,
                Ok(Some(PipelineEvent::Completed(results))) => return results,
                Ok(None) => return snapshot,
                Err(_) => {
                    self.log_watchdog(snapshot.len());
                    return snapshot;
                }
            }
        }
    }

    fn log_watchdog(&self, raw_results: usize) {
        let err = SearchError::DeadlineExceeded(format!(
            "watchdog after {}ms",
            self.ctx.config.watchdog_timeout.as_millis()
        ));
        tracing::warn!(error = %err, raw_results, "returning un-enriched results");
    }

    /// Run `job` on a new worker thread. Returns `false` if the thread
    /// could not be started.
    fn spawn_worker(&self, job: Job, sink: Sink) -> bool {
        let ctx = self.ctx.clone();
        self.spawn_tracked("deep-search-worker", move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to start worker runtime");
                    return;
                }
            };
            runtime.block_on(run_pipeline(&ctx, job, &sink));
        })
    }

    /// Start `body` on a named thread and record its handle, unless the
    /// engine is shut down. The check and the push happen under the same
    /// lock `shutdown` takes, so no thread escapes the final join.
    fn spawn_tracked<F>(&self, name: &str, body: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let mut workers = self.lock_workers();
        if self.is_shut_down() {
            tracing::debug!(thread = name, "not started after shutdown");
            return false;
        }
        match thread::Builder::new().name(name.to_owned()).spawn(body) {
            Ok(handle) => {
                workers.retain(|h| !h.is_finished());
                workers.push(handle);
                true
            }
            Err(e) => {
                tracing::warn!(thread = name, error = %e, "failed to spawn thread");
                false
            }
        }
    }

    fn lock_workers(&self) -> MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.workers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn start_warm_up(&self) {
        let urls: Vec<String> = self
            .ctx
            .config
            .warm_up_urls
            .iter()
            .take(WARM_UP_CONNECTIONS)
            .cloned()
            .collect();
        if urls.is_empty() {
            return;
        }
        let ctx = self.ctx.clone();
        self.spawn_tracked("deep-search-warmup", move || {
            let Ok(runtime) = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            else {
                return;
            };
            runtime.block_on(warm_up(&ctx, urls));
        });
    }
}

/// Open a throwaway pool and touch each URL so DNS and TLS setup happen
/// before the first real call. Failures are ignored.
async fn warm_up(ctx: &PipelineContext, urls: Vec<String>) {
    let Ok(pool) = ConnectionPool::open(&ctx.config, Arc::clone(&ctx.dns)) else {
        return;
    };
    let requests = urls.iter().map(|url| pool.client().head(url).send());
    let outcomes = futures::future::join_all(requests).await;
    let reachable = outcomes.iter().filter(|o| o.is_ok()).count();
    tracing::debug!(reachable, attempted = urls.len(), "warm-up finished");
    pool.close();
}

async fn run_pipeline(ctx: &PipelineContext, job: Job, sink: &Sink) {
    enter(CallPhase::Idle);
    let provider =
        BackendSelector::new(&ctx.config, ctx.credentials.as_ref()).resolve(job.backend());
    enter(CallPhase::BackendResolved);

    let pool = match ConnectionPool::open(&ctx.config, Arc::clone(&ctx.dns)) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!(error = %e, "connection pool unavailable");
            sink(PipelineEvent::Completed(Vec::new()));
            return;
        }
    };

    let (raw, deep_k) = match &job {
        Job::Search(request) => {
            tracing::trace!(
                query = %request.query,
                k = request.k,
                backend = %provider.backend(),
                "search"
            );
            let raw = provider
                .search_or_empty(pool.client(), &request.query, request.k)
                .await;
            (raw, request.deep_search.then_some(request.k))
        }
        Job::News(category, _) => {
            let raw = provider
                .news_or_empty(pool.client(), category, NEWS_LIMIT)
                .await;
            (raw, None)
        }
    };
    enter(CallPhase::RawResultsFetched);
    sink(PipelineEvent::RawFetched(raw.clone()));

    let results = match deep_k {
        Some(k) if !raw.is_empty() => {
            enter(CallPhase::DeepSearchRunning);
            let extractor = ContentExtractor::new(
                pool.client().clone(),
                Arc::clone(&ctx.cache),
                ctx.config.chunk_size,
                ctx.config.max_paragraphs,
            );
            DeepSearchOrchestrator::new(extractor, &ctx.config)
                .enrich(raw, k)
                .await
        }
        _ => {
            enter(CallPhase::Skipped);
            raw
        }
    };

    pool.close();
    enter(CallPhase::Completed);
    sink(PipelineEvent::Completed(results));
}
