//! TTL-bounded, single-flight memoizer for a zero-argument fetch

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::ApiError;

type FetchFn<T> = Box<dyn Fn() -> BoxFuture<'static, Result<T, ApiError>> + Send + Sync>;

/// Outcome of the last fetch, success or failure, with its completion time.
struct CachedEntry<T> {
    outcome: Result<T, ApiError>,
    fetched_at: Instant,
}

/// Cached wrapper around a vendor fetch function.
///
/// Both values and errors are cached for `ttl`, so a failing endpoint is not
/// hammered. The entry lock is held across the fetch: callers arriving while
/// a fetch is in flight queue behind it and then take that fetch's outcome,
/// whatever the TTL, so at most one upstream request is outstanding per
/// instance.
///
/// Refresh is lazy; nothing happens between calls to [`CachedValue::get`].
pub struct CachedValue<T> {
    fetch: FetchFn<T>,
    ttl: Duration,
    entry: Mutex<Option<CachedEntry<T>>>,
    /// Completed fetches; only advanced while `entry` is locked
    generation: AtomicU64,
}

impl<T> CachedValue<T>
where
    T: Clone + Send + 'static,
{
    /// Create a cache around `fetch` with the given TTL.
    pub fn new<F, Fut>(fetch: F, ttl: Duration) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        Self {
            fetch: Box::new(move || Box::pin(fetch())),
            ttl,
            entry: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Configured time-to-live
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached outcome if younger than the TTL, otherwise fetch.
    ///
    /// A caller that queued behind an in-flight fetch gets that fetch's
    /// outcome even when the TTL is zero. The fetch error is returned
    /// verbatim; the cache adds none of its own.
    pub async fn get(&self) -> Result<T, ApiError> {
        let seen = self.generation.load(Ordering::Acquire);
        let mut entry = self.entry.lock().await;

        if let Some(cached) = entry.as_ref() {
            if self.generation.load(Ordering::Acquire) != seen {
                log::debug!("Joined in-flight fetch");
                return cached.outcome.clone();
            }
            if cached.fetched_at.elapsed() < self.ttl {
                log::debug!("Cache hit (age {:?})", cached.fetched_at.elapsed());
                return cached.outcome.clone();
            }
        }

        log::debug!("Cache miss, fetching");
        let outcome = (self.fetch)().await;
        if let Err(ref err) = outcome {
            log::debug!("Fetch failed, caching error: {}", err);
        }

        *entry = Some(CachedEntry {
            outcome: outcome.clone(),
            fetched_at: Instant::now(),
        });
        self.generation.fetch_add(1, Ordering::Release);

        outcome
    }
}
