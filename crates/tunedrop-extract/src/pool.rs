//! Bounded offload of blocking extraction calls.
//!
//! # Design
//! - A semaphore caps concurrent calls; excess callers queue for a permit.
//! - Calls run on the Tokio blocking pool and are awaited with a deadline.
//! - A call that misses its deadline still waits for its worker before
//!   reporting [`ExtractError::TimedOut`]. Callers may then release the output
//!   directory without a late write recreating it.
//! - Subprocess extractors should use [`worker_deadline`] so the child is
//!   killed before the pool deadline fires.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::error::{ExtractError, ExtractResult};
use crate::extractor::{ExtractOptions, MediaExtractor};
use crate::model::Metadata;

const MAX_DEADLINE_MARGIN: Duration = Duration::from_secs(5);

/// Deadline for the extraction worker under a pool `timeout`.
///
/// The result is strictly shorter than any non-zero `timeout`, leaving a
/// margin of a tenth of the timeout (at most five seconds) to kill and reap
/// the child.
#[must_use]
pub fn worker_deadline(timeout: Duration) -> Duration {
    let margin = (timeout / 10).min(MAX_DEADLINE_MARGIN);
    if margin.is_zero() {
        return timeout.saturating_sub(Duration::from_nanos(1));
    }
    timeout.saturating_sub(margin)
}

/// Shared pool running a [`MediaExtractor`] off the request path.
#[derive(Clone)]
pub struct ExtractionPool {
    extractor: Arc<dyn MediaExtractor>,
    permits: Arc<Semaphore>,
    size: usize,
    timeout: Duration,
}

impl ExtractionPool {
    /// Create a pool allowing `size` concurrent calls, each bounded by `timeout`.
    #[must_use]
    pub fn new(extractor: Arc<dyn MediaExtractor>, size: usize, timeout: Duration) -> Self {
        let size = size.max(1);
        Self {
            extractor,
            permits: Arc::new(Semaphore::new(size)),
            size,
            timeout,
        }
    }

    /// Maximum concurrent calls.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Permits currently free.
    #[must_use]
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Run [`MediaExtractor::peek`] on the pool.
    ///
    /// # Errors
    ///
    /// Returns the extractor's error, [`ExtractError::TimedOut`] when the
    /// deadline passes, or a worker failure.
    pub async fn peek(&self, url: String) -> ExtractResult<Metadata> {
        self.run("peek", move |extractor| extractor.peek(&url)).await
    }

    /// Run [`MediaExtractor::extract`] on the pool.
    ///
    /// # Errors
    ///
    /// Returns the extractor's error, [`ExtractError::TimedOut`] when the
    /// deadline passes, or a worker failure.
    pub async fn extract(&self, url: String, options: ExtractOptions) -> ExtractResult<Metadata> {
        self.run("extract", move |extractor| extractor.extract(&url, &options))
            .await
    }

    async fn run<F>(&self, operation: &'static str, call: F) -> ExtractResult<Metadata>
    where
        F: FnOnce(&dyn MediaExtractor) -> ExtractResult<Metadata> + Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| ExtractError::PoolClosed)?;
        debug!(operation, available = self.available(), "extraction permit acquired");

        let extractor = Arc::clone(&self.extractor);
        let mut handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            call(extractor.as_ref())
        });

        match tokio::time::timeout(self.timeout, &mut handle).await {
            Ok(Ok(result)) => result,
            Ok(Err(source)) => Err(ExtractError::Worker { source }),
            Err(_) => {
                warn!(
                    operation,
                    timeout_secs = self.timeout.as_secs(),
                    "extraction exceeded its deadline; waiting for worker"
                );
                if let Err(err) = handle.await {
                    warn!(operation, error = %err, "timed out extraction worker failed");
                }
                Err(ExtractError::TimedOut {
                    operation,
                    timeout: self.timeout,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    struct SlowExtractor {
        delay: Duration,
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    impl SlowExtractor {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                delay,
                running: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            })
        }

        fn work(&self) -> ExtractResult<Metadata> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(self.delay);
            self.running.fetch_sub(1, Ordering::SeqCst);
            Ok(Metadata::item("done"))
        }
    }

    impl MediaExtractor for SlowExtractor {
        fn peek(&self, _url: &str) -> ExtractResult<Metadata> {
            self.work()
        }

        fn extract(&self, _url: &str, _options: &ExtractOptions) -> ExtractResult<Metadata> {
            self.work()
        }
    }

    struct PanickingExtractor;

    impl MediaExtractor for PanickingExtractor {
        fn peek(&self, _url: &str) -> ExtractResult<Metadata> {
            panic!("extractor crashed");
        }

        fn extract(&self, _url: &str, _options: &ExtractOptions) -> ExtractResult<Metadata> {
            panic!("extractor crashed");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_calls_never_exceed_pool_size() -> Result<()> {
        let extractor = SlowExtractor::new(Duration::from_millis(50));
        let pool = ExtractionPool::new(extractor.clone(), 2, Duration::from_secs(5));

        let mut calls = Vec::new();
        for index in 0..6 {
            let pool = pool.clone();
            calls.push(tokio::spawn(async move {
                pool.peek(format!("https://example.test/{index}")).await
            }));
        }
        for call in calls {
            call.await??;
        }

        assert!(extractor.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(pool.available(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn deadline_maps_to_timed_out() {
        let extractor = SlowExtractor::new(Duration::from_millis(500));
        let pool = ExtractionPool::new(extractor, 1, Duration::from_millis(20));
        let options = ExtractOptions::audio(std::path::Path::new("/tmp"));

        let result = pool.extract("https://example.test".to_string(), options).await;
        assert!(matches!(
            result,
            Err(ExtractError::TimedOut {
                operation: "extract",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn timed_out_call_returns_after_worker_finishes() {
        let extractor = SlowExtractor::new(Duration::from_millis(200));
        let pool = ExtractionPool::new(extractor.clone(), 1, Duration::from_millis(20));

        let result = pool.peek("https://example.test".to_string()).await;
        assert!(matches!(result, Err(ExtractError::TimedOut { .. })));
        assert_eq!(extractor.running.load(Ordering::SeqCst), 0);
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn worker_deadline_is_shorter_than_pool_timeout() {
        assert_eq!(
            worker_deadline(Duration::from_secs(600)),
            Duration::from_secs(595)
        );
        assert_eq!(
            worker_deadline(Duration::from_secs(10)),
            Duration::from_secs(9)
        );
        for timeout in [Duration::from_nanos(5), Duration::from_millis(50)] {
            assert!(worker_deadline(timeout) < timeout);
        }
        assert_eq!(worker_deadline(Duration::ZERO), Duration::ZERO);
    }

    #[tokio::test]
    async fn worker_panic_becomes_error() {
        let pool = ExtractionPool::new(Arc::new(PanickingExtractor), 1, Duration::from_secs(1));
        let result = pool.peek("https://example.test".to_string()).await;
        assert!(matches!(result, Err(ExtractError::Worker { .. })));
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn zero_size_is_clamped() {
        let pool = ExtractionPool::new(
            SlowExtractor::new(Duration::ZERO),
            0,
            Duration::from_secs(1),
        );
        assert_eq!(pool.size(), 1);
    }
}
