// src/feed.rs - Snapshot cell for one polled backend feed

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::error::{FleetError, Result};
use crate::metrics::Metrics;

/// Produces one fresh copy of the feed's data
pub type FetchFn<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T>> + Send + Sync>;

/// Bounded retry applied to every fetch of a feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Linear backoff with up to 25% jitter
    fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay.as_millis() as u64 * u64::from(attempt);
        let jitter = if base >= 4 { fastrand::u64(0..=base / 4) } else { 0 };
        Duration::from_millis(base + jitter)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

/// Immutable view of a feed at one point in time.
///
/// `data == None && error == None` means the first load is still running;
/// `error` set means the last fetch exhausted its retries. Stale data from
/// an earlier success is kept alongside an error.
#[derive(Debug)]
pub struct FeedSnapshot<T> {
    pub data: Option<Arc<T>>,
    pub error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub fetching: bool,
    /// Completed fetch cycles, successful or not
    pub cycles: u64,
}

impl<T> FeedSnapshot<T> {
    fn empty() -> Self {
        Self {
            data: None,
            error: None,
            updated_at: None,
            fetching: false,
            cycles: 0,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.data.is_none() && self.error.is_none()
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }
}

impl<T> Clone for FeedSnapshot<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            error: self.error.clone(),
            updated_at: self.updated_at,
            fetching: self.fetching,
            cycles: self.cycles,
        }
    }
}

type InflightFetch = Shared<BoxFuture<'static, ()>>;

struct FeedInner<T> {
    name: &'static str,
    fetch: FetchFn<T>,
    retry: RetryPolicy,
    state: watch::Sender<FeedSnapshot<T>>,
    inflight: Mutex<Option<InflightFetch>>,
    metrics: Option<Metrics>,
}

/// Cheaply cloneable handle to a feed
pub struct Feed<T> {
    inner: Arc<FeedInner<T>>,
}

impl<T> Clone for Feed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Send + Sync + 'static> Feed<T> {
    pub fn new(name: &'static str, fetch: FetchFn<T>, retry: RetryPolicy) -> Self {
        Self::build(name, fetch, retry, None)
    }

    pub fn with_metrics(
        name: &'static str,
        fetch: FetchFn<T>,
        retry: RetryPolicy,
        metrics: Metrics,
    ) -> Self {
        Self::build(name, fetch, retry, Some(metrics))
    }

    fn build(
        name: &'static str,
        fetch: FetchFn<T>,
        retry: RetryPolicy,
        metrics: Option<Metrics>,
    ) -> Self {
        let (state, _) = watch::channel(FeedSnapshot::empty());
        Self {
            inner: Arc::new(FeedInner {
                name,
                fetch,
                retry,
                state,
                inflight: Mutex::new(None),
                metrics,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    pub fn snapshot(&self) -> FeedSnapshot<T> {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedSnapshot<T>> {
        self.inner.state.subscribe()
    }

    /// Fetch now, joining any fetch already in flight instead of issuing
    /// a second request. Clears a terminal error state.
    pub async fn refresh(&self) -> FeedSnapshot<T> {
        let fetch = {
            let mut inflight = self.inner.inflight.lock().await;
            match inflight.as_ref() {
                Some(existing) => {
                    debug!(feed = self.inner.name, "Joining in-flight fetch");
                    existing.clone()
                }
                None => {
                    let inner = self.inner.clone();
                    let handle = tokio::spawn(async move {
                        inner.fetch_with_retry().await;
                        *inner.inflight.lock().await = None;
                    });
                    let shared = async move {
                        if let Err(e) = handle.await {
                            warn!(error = %e, "Feed fetch task ended abnormally");
                        }
                    }
                    .boxed()
                    .shared();
                    *inflight = Some(shared.clone());
                    shared
                }
            }
        };

        fetch.await;
        self.snapshot()
    }

    /// Scheduled fetch. Feeds in a terminal error state wait for a manual
    /// [`Feed::refresh`] instead of polling again.
    pub async fn poll(&self) -> Option<FeedSnapshot<T>> {
        if self.inner.state.borrow().has_error() {
            debug!(feed = self.inner.name, "Skipping poll of failed feed");
            return None;
        }
        Some(self.refresh().await)
    }
}

impl<T: Send + Sync + 'static> FeedInner<T> {
    async fn fetch_with_retry(&self) {
        self.state.send_modify(|s| s.fetching = true);

        let mut attempt = 0;
        let error = loop {
            attempt += 1;
            match (self.fetch)().await {
                Ok(data) => {
                    debug!(feed = self.name, attempt, "Feed fetched");
                    if let Some(metrics) = &self.metrics {
                        metrics.record_fetch(self.name);
                    }
                    self.state.send_modify(|s| {
                        s.data = Some(Arc::new(data));
                        s.error = None;
                        s.updated_at = Some(Utc::now());
                        s.fetching = false;
                        s.cycles += 1;
                    });
                    return;
                }
                Err(e) if e.is_transient() && attempt < self.retry.max_attempts => {
                    warn!(
                        feed = self.name,
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        error = %e,
                        "Feed fetch failed, retrying"
                    );
                    if let Some(metrics) = &self.metrics {
                        metrics.record_retry(self.name);
                    }
                    tokio::time::sleep(self.retry.delay_for(attempt)).await;
                }
                Err(e) => break e,
            }
        };

        let error = FleetError::FeedUnavailable {
            feed: self.name.to_string(),
            attempts: attempt,
            reason: error.to_string(),
        };
        info!(feed = self.name, error = %error, "Feed marked as failed until refreshed");
        if let Some(metrics) = &self.metrics {
            metrics.record_fetch_failure(self.name);
        }
        self.state.send_modify(|s| {
            s.error = Some(error.to_string());
            s.fetching = false;
            s.cycles += 1;
        });
    }
}
