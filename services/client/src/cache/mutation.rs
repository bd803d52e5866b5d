//! services/client/src/cache/mutation.rs
//!
//! Writes against the backend. A `Mutation` validates its input locally,
//! runs the write (never retried), and on success invalidates the cache keys
//! the write affects before resolving, so the caller observes fresh reads.
//! Calls on one `Mutation` run strictly in the order they were made.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use life_lessons_core::ports::{PortError, PortResult};
use life_lessons_core::validation::ValidationErrors;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::key::QueryKey;
use super::query::QueryCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationStatus {
    Idle,
    Pending,
    Success,
    Error,
}

type Runner<I, O> = Arc<dyn Fn(I) -> BoxFuture<'static, PortResult<O>> + Send + Sync>;
type Validator<I> = Arc<dyn Fn(&I) -> Result<(), ValidationErrors> + Send + Sync>;
type Dependents<I> = Arc<dyn Fn(&I) -> Vec<QueryKey> + Send + Sync>;
type Turn = Shared<BoxFuture<'static, ()>>;

#[derive(Debug)]
struct Progress {
    status: MutationStatus,
    error: Option<PortError>,
    in_flight: usize,
}

pub struct Mutation<I, O> {
    name: &'static str,
    cache: QueryCache,
    run: Runner<I, O>,
    validate: Option<Validator<I>>,
    dependents: Dependents<I>,
    /// Completion of the most recently queued call.
    last_turn: Arc<Mutex<Option<Turn>>>,
    progress: Arc<Mutex<Progress>>,
}

impl<I, O> std::fmt::Debug for Mutation<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mutation")
            .field("name", &self.name)
            .field("status", &self.status())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<I, O> Mutation<I, O> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn status(&self) -> MutationStatus {
        lock(&self.progress).status
    }

    pub fn error(&self) -> Option<PortError> {
        lock(&self.progress).error.clone()
    }

    pub fn is_pending(&self) -> bool {
        self.status() == MutationStatus::Pending
    }

    pub fn is_success(&self) -> bool {
        self.status() == MutationStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status() == MutationStatus::Error
    }

    /// Back to `Idle`, unless a call is still running.
    pub fn reset(&self) {
        let mut progress = lock(&self.progress);
        if progress.in_flight == 0 {
            progress.status = MutationStatus::Idle;
            progress.error = None;
        }
    }
}

impl<I, O> Mutation<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    pub fn new<F, Fut>(name: &'static str, cache: QueryCache, run: F) -> Self
    where
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = PortResult<O>> + Send + 'static,
    {
        Self {
            name,
            cache,
            run: Arc::new(move |input| run(input).boxed()),
            validate: None,
            dependents: Arc::new(|_| Vec::new()),
            last_turn: Arc::new(Mutex::new(None)),
            progress: Arc::new(Mutex::new(Progress {
                status: MutationStatus::Idle,
                error: None,
                in_flight: 0,
            })),
        }
    }

    /// Checks the input before any request is made.
    pub fn validate_with<V>(mut self, validate: V) -> Self
    where
        V: Fn(&I) -> Result<(), ValidationErrors> + Send + Sync + 'static,
    {
        self.validate = Some(Arc::new(validate));
        self
    }

    /// The cache prefixes a successful call makes stale.
    pub fn invalidates<D>(mut self, dependents: D) -> Self
    where
        D: Fn(&I) -> Vec<QueryKey> + Send + Sync + 'static,
    {
        self.dependents = Arc::new(dependents);
        self
    }

    /// Runs one write.
    ///
    /// Invalid input fails here with `PortError::Validation` and nothing is
    /// sent. Otherwise the call waits behind earlier calls, performs the write
    /// and, if it succeeded, finishes invalidating the dependent keys before
    /// returning. Dropping the returned future does not cancel the write.
    pub async fn mutate(&self, input: I) -> PortResult<O> {
        if let Some(validate) = &self.validate {
            if let Err(errors) = validate(&input) {
                debug!(mutation = self.name, "rejected locally: {}", errors);
                let err = PortError::Validation(errors);
                let mut progress = lock(&self.progress);
                if progress.in_flight == 0 {
                    progress.status = MutationStatus::Error;
                }
                progress.error = Some(err.clone());
                return Err(err);
            }
        }

        let dependents = (self.dependents)(&input);
        let write = (self.run)(input);

        let (done, turn) = oneshot::channel::<()>();
        let turn: Turn = turn.map(|_| ()).boxed().shared();
        let previous = lock(&self.last_turn).replace(turn);
        {
            let mut progress = lock(&self.progress);
            progress.status = MutationStatus::Pending;
            progress.error = None;
            progress.in_flight += 1;
        }

        let name = self.name;
        let cache = self.cache.clone();
        let progress = Arc::clone(&self.progress);
        let handle = tokio::spawn(async move {
            if let Some(previous) = previous {
                previous.await;
            }
            let result = AssertUnwindSafe(write)
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(PortError::Unexpected("mutation panicked".to_string())));
            match &result {
                Ok(_) => {
                    for key in &dependents {
                        cache.invalidate(key).await;
                    }
                    debug!(mutation = name, invalidated = dependents.len(), "mutation succeeded");
                }
                Err(err) => warn!(mutation = name, "mutation failed: {}", err),
            }
            {
                let mut progress = lock(&progress);
                progress.in_flight = progress.in_flight.saturating_sub(1);
                match &result {
                    Ok(_) if progress.in_flight == 0 => {
                        progress.status = MutationStatus::Success;
                        progress.error = None;
                    }
                    Ok(_) => {}
                    Err(err) => {
                        progress.status = MutationStatus::Error;
                        progress.error = Some(err.clone());
                    }
                }
            }
            let _ = done.send(());
            result
        });

        handle
            .await
            .unwrap_or_else(|e| Err(PortError::Unexpected(format!("mutation task failed: {}", e))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::query::QueryOptions;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn cache() -> QueryCache {
        QueryCache::new(QueryOptions {
            stale_time: Duration::from_secs(60),
            retry_delay: Duration::ZERO,
            ..QueryOptions::default()
        })
    }

    fn my_lessons() -> QueryKey {
        QueryKey::new(["lessons", "my"])
    }

    #[tokio::test]
    async fn validation_failures_make_no_calls() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mutation = Mutation::new("add-comment", cache(), move |text: String| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok(text) }
        })
        .validate_with(|text: &String| {
            let mut errors = ValidationErrors::default();
            if text.trim().is_empty() {
                errors.push("text", "Comment cannot be empty");
            }
            errors.into_result()
        });

        let err = mutation.mutate("   ".to_string()).await.unwrap_err();
        assert!(matches!(err, PortError::Validation(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(mutation.is_error());

        assert_eq!(mutation.mutate("thanks".to_string()).await.unwrap(), "thanks");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(mutation.is_success());
    }

    #[tokio::test]
    async fn failed_writes_are_not_retried_and_invalidate_nothing() {
        let cache = cache();
        let reads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&reads);
        let _observer = cache.observe(my_lessons());
        cache
            .query(my_lessons(), move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(Vec::<String>::new()) }
            })
            .await;

        let writes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&writes);
        let mutation = Mutation::new("create-lesson", cache.clone(), move |_: ()| {
            counter.fetch_add(1, Ordering::SeqCst);
            async {
                Err::<(), _>(PortError::Server {
                    status: 500,
                    message: "boom".to_string(),
                })
            }
        })
        .invalidates(|_| vec![QueryKey::new(["lessons"])]);

        assert!(mutation.mutate(()).await.is_err());
        assert_eq!(writes.load(Ordering::SeqCst), 1);
        assert_eq!(reads.load(Ordering::SeqCst), 1);
        assert_eq!(mutation.error(), Some(PortError::Server { status: 500, message: "boom".to_string() }));
    }

    #[tokio::test]
    async fn success_refreshes_observed_dependents_before_resolving() {
        let cache = cache();
        let server = Arc::new(Mutex::new(vec!["first".to_string()]));

        let reader = Arc::clone(&server);
        let read = move || {
            let reader = Arc::clone(&reader);
            async move { Ok(lock(&reader).clone()) }
        };
        let observer = cache.observe(my_lessons());
        cache.query(my_lessons(), read).await;

        let writer = Arc::clone(&server);
        let create = Mutation::new("create-lesson", cache.clone(), move |title: String| {
            let writer = Arc::clone(&writer);
            async move {
                lock(&writer).push(title);
                Ok(())
            }
        })
        .invalidates(|_| vec![QueryKey::new(["lessons"])]);

        create.mutate("second".to_string()).await.unwrap();
        let state = observer.state::<Vec<String>>();
        assert_eq!(
            state.data.as_deref(),
            Some(&vec!["first".to_string(), "second".to_string()])
        );
    }

    #[tokio::test]
    async fn calls_run_in_the_order_they_were_made() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&order);
        let mutation = Mutation::new("toggle-favorite", cache(), move |saved: bool| {
            let log = Arc::clone(&log);
            async move {
                // The first call is the slowest; it must still land first.
                if saved {
                    tokio::time::sleep(Duration::from_millis(30)).await;
                }
                lock(&log).push(saved);
                Ok(saved)
            }
        });

        let (a, b) = tokio::join!(mutation.mutate(true), mutation.mutate(false));
        assert_eq!((a.unwrap(), b.unwrap()), (true, false));
        assert_eq!(*lock(&order), vec![true, false]);
        assert_eq!(mutation.status(), MutationStatus::Success);
    }

    #[tokio::test]
    async fn dropping_the_caller_does_not_cancel_the_write() {
        let writes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&writes);
        let mutation = Mutation::new("delete-lesson", cache(), move |_: ()| {
            let counter = Arc::clone(&counter);
            async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        let abandoned = tokio::time::timeout(Duration::from_millis(1), mutation.mutate(())).await;
        assert!(abandoned.is_err());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn a_panicking_write_settles_as_an_error() {
        let mutation = Mutation::new("update-profile", cache(), |_: ()| async {
            if true {
                panic!("write blew up");
            }
            Ok(())
        });

        let err = mutation.mutate(()).await.unwrap_err();
        assert!(matches!(err, PortError::Unexpected(_)));
        assert!(mutation.is_error());
        mutation.reset();
        assert_eq!(mutation.status(), MutationStatus::Idle);
        assert_eq!(format!("{:?}", mutation), "Mutation { name: \"update-profile\", status: Idle }");
    }

    #[tokio::test]
    async fn a_later_success_clears_the_earlier_error() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let mutation = Mutation::new("toggle-like", cache(), move |_: ()| {
            let first = counter.fetch_add(1, Ordering::SeqCst) == 0;
            async move {
                if first {
                    Err(PortError::Transport("connection reset".to_string()))
                } else {
                    Ok(())
                }
            }
        });

        let (a, b) = tokio::join!(mutation.mutate(()), mutation.mutate(()));
        assert!(a.is_err());
        assert!(b.is_ok());
        assert!(mutation.is_success());
        assert_eq!(mutation.error(), None);
    }
}
