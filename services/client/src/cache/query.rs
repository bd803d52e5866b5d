//! services/client/src/cache/query.rs
//!
//! The query cache: a keyed in-memory store of remote reads.
//!
//! - Concurrent reads of one key share a single fetch.
//! - Fresh data is served from memory; stale data is served immediately
//!   while a background refetch runs.
//! - A failed read is retried (once by default) when the error is transient.
//! - Responses carry the sequence number of the fetch that produced them, and
//!   a response older than what is already stored is discarded, so a slow
//!   early request can never overwrite a newer one.
//! - `invalidate` marks entries stale, refetching observed ones right away
//!   and leaving the rest to refetch on their next read.
//!
//! Entries are never evicted; the cache lives as long as the app context.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use futures::future::{join_all, BoxFuture, FutureExt, Shared};
use life_lessons_core::ports::{PortError, PortResult};
use tokio::sync::watch;
use tracing::{debug, warn};

use super::key::QueryKey;
use crate::config::Config;

type AnyData = Arc<dyn Any + Send + Sync>;
type FetchFuture = Shared<BoxFuture<'static, PortResult<AnyData>>>;
type Fetcher = Arc<dyn Fn() -> BoxFuture<'static, PortResult<AnyData>> + Send + Sync>;

const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Idle,
    Loading,
    Success,
    Error,
}

/// Per-query fetching policy.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub stale_time: Duration,
    /// Extra attempts after a transient failure.
    pub retry: u32,
    /// Delay before the first retry; doubles on each further attempt.
    pub retry_delay: Duration,
    /// Window refocus refetching is off unless a query opts in.
    pub refetch_on_focus: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            stale_time: Duration::ZERO,
            retry: 1,
            retry_delay: Duration::from_secs(1),
            refetch_on_focus: false,
        }
    }
}

impl QueryOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            stale_time: config.query_stale_time,
            retry: config.query_retry,
            ..Self::default()
        }
    }
}

/// What a view sees when it reads a query.
#[derive(Debug)]
pub struct QueryState<T> {
    pub status: QueryStatus,
    pub data: Option<Arc<T>>,
    pub error: Option<PortError>,
    pub updated_at: Option<Instant>,
    pub is_fetching: bool,
}

impl<T> QueryState<T> {
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    /// The data if there is any, otherwise the error that prevented it.
    pub fn into_result(self) -> PortResult<Arc<T>> {
        match self.data {
            Some(data) => Ok(data),
            None => Err(self
                .error
                .unwrap_or_else(|| PortError::Unexpected("query has no data".to_string()))),
        }
    }
}

struct Entry {
    status: QueryStatus,
    data: Option<AnyData>,
    error: Option<PortError>,
    updated_at: Option<Instant>,
    invalidated: bool,
    /// Fetches with a sequence number at or below this started before the
    /// last invalidation and cannot satisfy a read that needs fresh data.
    invalidated_at: u64,
    applied_seq: u64,
    inflight: Option<(u64, FetchFuture)>,
    fetcher: Option<Fetcher>,
    options: QueryOptions,
    observers: usize,
    version: watch::Sender<u64>,
}

impl Entry {
    fn new(options: QueryOptions) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            updated_at: None,
            invalidated: false,
            invalidated_at: 0,
            applied_seq: 0,
            inflight: None,
            fetcher: None,
            options,
            observers: 0,
            version,
        }
    }

    fn is_stale(&self) -> bool {
        self.invalidated
            || match self.updated_at {
                Some(at) => at.elapsed() >= self.options.stale_time,
                None => true,
            }
    }

    /// Drops data and fetch state, keeping observers and their channel.
    fn reset(&mut self) {
        self.status = QueryStatus::Idle;
        self.data = None;
        self.error = None;
        self.updated_at = None;
        self.invalidated = false;
        self.inflight = None;
        self.fetcher = None;
        self.notify();
    }

    fn notify(&self) {
        self.version.send_modify(|v| *v = v.wrapping_add(1));
    }

    fn snapshot<T: Send + Sync + 'static>(&self, key: &QueryKey) -> QueryState<T> {
        let (data, error) = match &self.data {
            None => (None, self.error.clone()),
            Some(any) => match Arc::clone(any).downcast::<T>() {
                Ok(data) => (Some(data), self.error.clone()),
                Err(_) => (
                    None,
                    Some(PortError::Unexpected(format!(
                        "cache entry {} holds a different type",
                        key
                    ))),
                ),
            },
        };
        QueryState {
            status: self.status,
            data,
            error,
            updated_at: self.updated_at,
            is_fetching: self.inflight.is_some(),
        }
    }
}

struct Inner {
    entries: Mutex<HashMap<QueryKey, Entry>>,
    seq: AtomicU64,
    /// Responses from fetches issued before the last `clear` are dropped.
    cleared_at: AtomicU64,
    defaults: QueryOptions,
}

impl Inner {
    fn entries(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn apply(&self, key: &QueryKey, seq: u64, result: &PortResult<AnyData>) {
        if seq <= self.cleared_at.load(Ordering::SeqCst) {
            debug!(%key, seq, "dropping response issued before the cache was cleared");
            return;
        }
        let mut entries = self.entries();
        let Some(entry) = entries.get_mut(key) else {
            return;
        };
        if matches!(&entry.inflight, Some((s, _)) if *s == seq) {
            entry.inflight = None;
        }
        if seq < entry.applied_seq {
            debug!(%key, seq, applied = entry.applied_seq, "discarding response older than cached data");
            entry.notify();
            return;
        }
        entry.applied_seq = seq;
        match result {
            Ok(data) => {
                entry.data = Some(Arc::clone(data));
                entry.error = None;
                entry.status = QueryStatus::Success;
                entry.updated_at = Some(Instant::now());
                if seq > entry.invalidated_at {
                    entry.invalidated = false;
                }
            }
            Err(err) => {
                entry.error = Some(err.clone());
                entry.status = QueryStatus::Error;
            }
        }
        entry.notify();
    }
}

/// Starts a fetch for `entry` on the runtime and records it as in flight.
/// Returns `None` when the entry has never been given a fetcher.
fn start_fetch(inner: &Arc<Inner>, key: &QueryKey, entry: &mut Entry) -> Option<FetchFuture> {
    let fetcher = entry.fetcher.clone()?;
    let seq = inner.next_seq();
    let options = entry.options.clone();
    let task_inner = Arc::clone(inner);
    let task_key = key.clone();

    let handle = tokio::spawn(async move {
        let result = AssertUnwindSafe(fetch_with_retry(&task_key, fetcher, &options))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(PortError::Unexpected("query fetcher panicked".to_string())));
        task_inner.apply(&task_key, seq, &result);
        result
    });
    let shared = async move {
        handle
            .await
            .unwrap_or_else(|e| Err(PortError::Unexpected(format!("fetch task failed: {}", e))))
    }
    .boxed()
    .shared();

    debug!(%key, seq, "fetch started");
    if entry.data.is_none() {
        entry.status = QueryStatus::Loading;
    }
    entry.inflight = Some((seq, shared.clone()));
    entry.notify();
    Some(shared)
}

async fn fetch_with_retry(
    key: &QueryKey,
    fetcher: Fetcher,
    options: &QueryOptions,
) -> PortResult<AnyData> {
    let mut attempt: u32 = 0;
    loop {
        match fetcher().await {
            Ok(data) => return Ok(data),
            Err(err) if err.is_transient() && attempt < options.retry => {
                attempt += 1;
                let delay = options
                    .retry_delay
                    .saturating_mul(1u32 << (attempt - 1).min(5))
                    .min(MAX_RETRY_DELAY);
                warn!(%key, attempt, "query failed, retrying: {}", err);
                tokio::time::sleep(delay).await;
            }
            Err(err) => {
                warn!(%key, "query failed: {}", err);
                return Err(err);
            }
        }
    }
}

/// A cheap-to-clone handle to one shared cache.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.len())
            .finish()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(QueryOptions::default())
    }
}

impl QueryCache {
    pub fn new(defaults: QueryOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                seq: AtomicU64::new(0),
                cleared_at: AtomicU64::new(0),
                defaults,
            }),
        }
    }

    pub fn defaults(&self) -> &QueryOptions {
        &self.inner.defaults
    }

    pub fn len(&self) -> usize {
        self.inner.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads `key` with the default options. See [`QueryCache::query_with`].
    pub async fn query<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> QueryState<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = PortResult<T>> + Send + 'static,
    {
        let options = self.inner.defaults.clone();
        self.query_with(key, options, fetcher).await
    }

    /// Reads `key`, fetching with `fetcher` when needed.
    ///
    /// Cached data that has not been invalidated is returned at once (with a
    /// background refetch if it is older than `stale_time`). Otherwise the
    /// call waits for a fetch, joining one already in flight for the same key.
    pub async fn query_with<T, F, Fut>(
        &self,
        key: QueryKey,
        options: QueryOptions,
        fetcher: F,
    ) -> QueryState<T>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = PortResult<T>> + Send + 'static,
    {
        let fetcher: Fetcher = Arc::new(move || {
            let fut = fetcher();
            async move { fut.await.map(|data| Arc::new(data) as AnyData) }.boxed()
        });

        let pending = {
            let mut entries = self.inner.entries();
            let entry = entries
                .entry(key.clone())
                .or_insert_with(|| Entry::new(options.clone()));
            entry.fetcher = Some(fetcher);
            entry.options = options;

            if entry.data.is_some() && !entry.invalidated {
                if entry.is_stale() && entry.inflight.is_none() {
                    debug!(%key, "serving stale data while refetching");
                    start_fetch(&self.inner, &key, entry);
                }
                None
            } else {
                let joinable = entry
                    .inflight
                    .as_ref()
                    .filter(|(seq, _)| *seq > entry.invalidated_at)
                    .map(|(_, fut)| fut.clone());
                match joinable {
                    Some(fut) => {
                        debug!(%key, "joining in-flight fetch");
                        Some(fut)
                    }
                    None => start_fetch(&self.inner, &key, entry),
                }
            }
        };

        if let Some(fut) = pending {
            let _ = fut.await;
        }
        self.peek(&key)
    }

    /// Like [`QueryCache::query`], but as a `Result` for `?`-style callers.
    pub async fn fetch<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> PortResult<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = PortResult<T>> + Send + 'static,
    {
        self.query(key, fetcher).await.into_result()
    }

    /// The current state of `key` without triggering any fetch.
    pub fn peek<T: Send + Sync + 'static>(&self, key: &QueryKey) -> QueryState<T> {
        let entries = self.inner.entries();
        match entries.get(key) {
            Some(entry) => entry.snapshot(key),
            None => QueryState {
                status: QueryStatus::Idle,
                data: None,
                error: None,
                updated_at: None,
                is_fetching: false,
            },
        }
    }

    /// Seeds `key` with data obtained elsewhere, e.g. the user loaded at sign-in.
    pub fn set_data<T: Send + Sync + 'static>(&self, key: QueryKey, value: T) {
        let seq = self.inner.next_seq();
        let mut entries = self.inner.entries();
        let entry = entries
            .entry(key)
            .or_insert_with(|| Entry::new(self.inner.defaults.clone()));
        entry.data = Some(Arc::new(value));
        entry.error = None;
        entry.status = QueryStatus::Success;
        entry.updated_at = Some(Instant::now());
        entry.invalidated = false;
        entry.applied_seq = seq;
        entry.notify();
    }

    /// Marks every entry under `prefix` stale. Observed entries are refetched
    /// now and this call waits for them; unobserved ones refetch on next read.
    pub async fn invalidate(&self, prefix: &QueryKey) {
        let pending: Vec<FetchFuture> = {
            let mut entries = self.inner.entries();
            let floor = self.inner.seq.load(Ordering::SeqCst);
            let mut pending = Vec::new();
            for (key, entry) in entries.iter_mut().filter(|(k, _)| k.starts_with(prefix)) {
                entry.invalidated = true;
                entry.invalidated_at = floor;
                if entry.observers > 0 {
                    if let Some(fut) = start_fetch(&self.inner, key, entry) {
                        pending.push(fut);
                    }
                }
            }
            pending
        };
        debug!(%prefix, refetching = pending.len(), "invalidated queries");
        join_all(pending).await;
    }

    /// Registers interest in `key` for as long as the returned observer lives.
    pub fn observe(&self, key: QueryKey) -> QueryObserver {
        let receiver = {
            let mut entries = self.inner.entries();
            let entry = entries
                .entry(key.clone())
                .or_insert_with(|| Entry::new(self.inner.defaults.clone()));
            entry.observers += 1;
            entry.version.subscribe()
        };
        QueryObserver {
            cache: self.clone(),
            key,
            receiver,
        }
    }

    /// Window-refocus hook. Refetches stale observed queries that opted in;
    /// with the default options this does nothing. Must run inside a Tokio runtime.
    pub fn on_focus(&self) -> usize {
        let mut entries = self.inner.entries();
        let mut started = 0;
        for (key, entry) in entries.iter_mut() {
            if entry.observers > 0
                && entry.options.refetch_on_focus
                && entry.is_stale()
                && entry.inflight.is_none()
                && start_fetch(&self.inner, key, entry).is_some()
            {
                started += 1;
            }
        }
        started
    }

    /// Forgets every cached result, e.g. on logout. Observed entries stay
    /// registered but empty; in-flight responses are dropped when they land.
    pub fn clear(&self) {
        let floor = self.inner.seq.load(Ordering::SeqCst);
        self.inner.cleared_at.store(floor, Ordering::SeqCst);
        let mut entries = self.inner.entries();
        entries.retain(|_, entry| entry.observers > 0);
        for entry in entries.values_mut() {
            entry.reset();
        }
        debug!(kept = entries.len(), "query cache cleared");
    }

    fn release(&self, key: &QueryKey) {
        let mut entries = self.inner.entries();
        if let Some(entry) = entries.get_mut(key) {
            entry.observers = entry.observers.saturating_sub(1);
        }
    }
}

/// A mounted view's interest in one query. Dropping it unmounts.
pub struct QueryObserver {
    cache: QueryCache,
    key: QueryKey,
    receiver: watch::Receiver<u64>,
}

impl QueryObserver {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Waits until the entry changes (new data, error, or a fetch starting).
    /// Returns `false` if the entry can no longer change.
    pub async fn changed(&mut self) -> bool {
        self.receiver.changed().await.is_ok()
    }

    pub fn state<T: Send + Sync + 'static>(&self) -> QueryState<T> {
        self.cache.peek(&self.key)
    }
}

impl Drop for QueryObserver {
    fn drop(&mut self) {
        self.cache.release(&self.key);
    }
}
