//! Coalescing of concurrent fetches for the same key.
//!
//! The first caller for a key spawns the fetch; later callers subscribe to
//! its outcome. A caller that gives up waiting only drops its subscription:
//! the spawned fetch runs to completion for the remaining waiters.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use nerkh_common::Rate;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;

use crate::cache::CacheKey;
use crate::error::{ProviderError, ProviderResult};

type Outcome = Option<ProviderResult<Rate>>;

/// Table of fetches currently running, one per key.
#[derive(Default)]
pub struct InFlight {
    pending: Mutex<HashMap<CacheKey, watch::Receiver<Outcome>>>,
}

/// Removes the key when the fetch task ends, including on panic.
struct PendingGuard {
    inflight: Arc<InFlight>,
    key: CacheKey,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.inflight.pending.lock().remove(&self.key);
    }
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Await the fetch for `key`, starting it with `start` if none is
    /// running. Waits at most `wait`; on timeout the fetch keeps going.
    pub async fn run<F, Fut>(
        self: &Arc<Self>,
        key: CacheKey,
        wait: Duration,
        start: F,
    ) -> ProviderResult<Rate>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ProviderResult<Rate>> + Send + 'static,
    {
        let (mut rx, leader) = {
            let mut pending = self.pending.lock();
            match pending.get(&key) {
                Some(rx) => (rx.clone(), None),
                None => {
                    let (tx, rx) = watch::channel(None);
                    pending.insert(key.clone(), rx.clone());
                    (rx, Some(tx))
                }
            }
        };

        match leader {
            Some(tx) => {
                let guard = PendingGuard {
                    inflight: Arc::clone(self),
                    key: key.clone(),
                };
                let fetch = start();
                tokio::spawn(async move {
                    let outcome = fetch.await;
                    drop(guard);
                    tx.send_replace(Some(outcome));
                });
            }
            None => debug!(key = %key, "Joining in-flight fetch"),
        }

        let waited = tokio::time::timeout(wait, rx.wait_for(Option::is_some))
            .await
            .map(|r| r.map(|outcome| (*outcome).clone()));

        match waited {
            Ok(Ok(outcome)) => outcome.unwrap_or(Err(ProviderError::Timeout)),
            Ok(Err(_)) => Err(ProviderError::NetworkFailure(
                "fetch task ended without a result".to_string(),
            )),
            Err(_) => {
                debug!(key = %key, "Gave up waiting for in-flight fetch");
                Err(ProviderError::Timeout)
            }
        }
    }

    /// Number of fetches currently running.
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Check if no fetch is running.
    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nerkh_common::{CurrencyCode, SourceId};
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::task::JoinSet;

    fn key() -> CacheKey {
        CacheKey::new(SourceId::bonbast(), CurrencyCode::eur(), CurrencyCode::irt())
    }

    fn rate() -> Rate {
        Rate::new(
            SourceId::bonbast(),
            CurrencyCode::eur(),
            CurrencyCode::irt(),
            Some(dec!(100000)),
            Some(dec!(101000)),
        )
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_fetch() {
        let inflight = Arc::new(InFlight::new());
        let fetches = Arc::new(AtomicUsize::new(0));
        let mut tasks = JoinSet::new();

        for _ in 0..20 {
            let inflight = inflight.clone();
            let fetches = fetches.clone();
            tasks.spawn(async move {
                inflight
                    .run(key(), Duration::from_secs(5), move || async move {
                        fetches.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Ok(rate())
                    })
                    .await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let result = joined.unwrap();
            assert_eq!(result.unwrap().sell, Some(dec!(101000)));
        }

        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        assert!(inflight.is_empty());
    }

    #[tokio::test]
    async fn test_waiter_timeout_does_not_cancel_fetch() {
        let inflight = Arc::new(InFlight::new());
        let finished = Arc::new(AtomicUsize::new(0));
        let done = finished.clone();

        let result = inflight
            .run(key(), Duration::from_millis(10), move || async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                done.fetch_add(1, Ordering::SeqCst);
                Ok(rate())
            })
            .await;

        assert_eq!(result, Err(ProviderError::Timeout));
        assert_eq!(inflight.len(), 1);

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert!(inflight.is_empty());
    }

    #[tokio::test]
    async fn test_errors_are_shared_and_not_retained() {
        let inflight = Arc::new(InFlight::new());

        let result = inflight
            .run(key(), Duration::from_secs(1), || async {
                Err(ProviderError::NotListed)
            })
            .await;
        assert_eq!(result, Err(ProviderError::NotListed));

        tokio::time::sleep(Duration::from_millis(20)).await;
        let retried = inflight
            .run(key(), Duration::from_secs(1), || async { Ok(rate()) })
            .await;
        assert!(retried.is_ok());
    }
}
