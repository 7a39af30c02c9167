//! Rate provider trait and composition.

use async_trait::async_trait;
use nerkh_common::{CurrencyCode, Rate, SourceFamily, SourceId};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};

/// A single upstream rate source.
///
/// Implementations must bound their own latency (returning
/// [`ProviderError::Timeout`]), must apply their unit corrections before
/// returning, and must never panic or propagate anything other than a
/// [`ProviderError`].
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Identifier used for cache keys and corrections.
    fn source(&self) -> &SourceId;

    /// Family of the source.
    fn family(&self) -> SourceFamily;

    /// Fetch the current quote of `base` in `quote`.
    async fn fetch(&self, base: &CurrencyCode, quote: &CurrencyCode) -> ProviderResult<Rate>;
}

/// Tries several providers of the same family in order and returns the
/// first quote obtained.
pub struct FallbackProvider {
    source: SourceId,
    family: SourceFamily,
    providers: Vec<Arc<dyn RateProvider>>,
}

impl FallbackProvider {
    /// Create a fallback chain published under `source`.
    pub fn new(
        source: SourceId,
        family: SourceFamily,
        providers: Vec<Arc<dyn RateProvider>>,
    ) -> Self {
        Self {
            source,
            family,
            providers,
        }
    }

    /// Number of chained providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Check if the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[async_trait]
impl RateProvider for FallbackProvider {
    fn source(&self) -> &SourceId {
        &self.source
    }

    fn family(&self) -> SourceFamily {
        self.family
    }

    async fn fetch(&self, base: &CurrencyCode, quote: &CurrencyCode) -> ProviderResult<Rate> {
        let mut last_error = ProviderError::NotListed;

        for provider in &self.providers {
            match provider.fetch(base, quote).await {
                Ok(rate) => {
                    debug!(
                        provider = %provider.source(),
                        base = %base,
                        quote = %quote,
                        "Got rate from provider"
                    );
                    return Ok(rate);
                }
                Err(e) => {
                    warn!(
                        provider = %provider.source(),
                        base = %base,
                        quote = %quote,
                        reason = e.reason(),
                        error = %e,
                        "Provider failed to return rate"
                    );
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}

/// Mock rate provider for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockRateProvider {
    source: SourceId,
    family: SourceFamily,
    rates: dashmap::DashMap<(CurrencyCode, CurrencyCode), Rate>,
    failures: dashmap::DashMap<(CurrencyCode, CurrencyCode), ProviderError>,
    calls: dashmap::DashMap<(CurrencyCode, CurrencyCode), usize>,
    total_calls: std::sync::atomic::AtomicUsize,
    delay: parking_lot::Mutex<Option<std::time::Duration>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockRateProvider {
    /// Create a new mock provider.
    pub fn new(source: impl Into<SourceId>, family: SourceFamily) -> Self {
        Self {
            source: source.into(),
            family,
            rates: dashmap::DashMap::new(),
            failures: dashmap::DashMap::new(),
            calls: dashmap::DashMap::new(),
            total_calls: std::sync::atomic::AtomicUsize::new(0),
            delay: parking_lot::Mutex::new(None),
        }
    }

    /// Mock black-market source.
    pub fn black_market() -> Self {
        Self::new(SourceId::bonbast(), SourceFamily::BlackMarket)
    }

    /// Mock general-purpose source.
    pub fn general() -> Self {
        Self::new(SourceId::open_er_api(), SourceFamily::General)
    }

    /// Set a rate for its currency pair.
    pub fn set_rate(&self, rate: Rate) {
        self.failures.remove(&(rate.base.clone(), rate.quote.clone()));
        self.rates.insert((rate.base.clone(), rate.quote.clone()), rate);
    }

    /// Set a quote by codes.
    pub fn set_quote(
        &self,
        base: &str,
        quote: &str,
        buy: Option<rust_decimal::Decimal>,
        sell: Option<rust_decimal::Decimal>,
    ) {
        let rate = Rate::new(
            self.source.clone(),
            CurrencyCode::new(base).expect("valid base code"),
            CurrencyCode::new(quote).expect("valid quote code"),
            buy,
            sell,
        );
        self.set_rate(rate);
    }

    /// Make fetches of a pair fail with `error`.
    pub fn fail(&self, base: &str, quote: &str, error: ProviderError) {
        let key = (
            CurrencyCode::new(base).expect("valid base code"),
            CurrencyCode::new(quote).expect("valid quote code"),
        );
        self.rates.remove(&key);
        self.failures.insert(key, error);
    }

    /// Remove every rate, so all fetches report `NotListed`.
    pub fn clear(&self) {
        self.rates.clear();
        self.failures.clear();
    }

    /// Delay every fetch.
    pub fn set_delay(&self, delay: std::time::Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Fetches issued for one pair.
    pub fn calls_for(&self, base: &str, quote: &str) -> usize {
        let key = (
            CurrencyCode::new(base).expect("valid base code"),
            CurrencyCode::new(quote).expect("valid quote code"),
        );
        self.calls.get(&key).map(|c| *c).unwrap_or(0)
    }

    /// Fetches issued in total.
    pub fn total_calls(&self) -> usize {
        self.total_calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl RateProvider for MockRateProvider {
    fn source(&self) -> &SourceId {
        &self.source
    }

    fn family(&self) -> SourceFamily {
        self.family
    }

    async fn fetch(&self, base: &CurrencyCode, quote: &CurrencyCode) -> ProviderResult<Rate> {
        let key = (base.clone(), quote.clone());
        *self.calls.entry(key.clone()).or_insert(0) += 1;
        self.total_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.failures.get(&key) {
            return Err(error.clone());
        }

        self.rates
            .get(&key)
            .map(|r| r.clone())
            .ok_or(ProviderError::NotListed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_mock_provider() {
        let provider = MockRateProvider::black_market();
        provider.set_quote("EUR", "IRT", Some(dec!(100000)), Some(dec!(101000)));

        let rate = provider
            .fetch(&CurrencyCode::eur(), &CurrencyCode::irt())
            .await
            .unwrap();

        assert_eq!(rate.buy, Some(dec!(100000)));
        assert_eq!(rate.sell, Some(dec!(101000)));
        assert_eq!(provider.calls_for("EUR", "IRT"), 1);

        let missing = provider
            .fetch(&CurrencyCode::usd(), &CurrencyCode::irt())
            .await;
        assert_eq!(missing, Err(ProviderError::NotListed));
        assert_eq!(provider.total_calls(), 2);
    }

    #[tokio::test]
    async fn test_fallback_provider_first_success_wins() {
        let p1 = Arc::new(MockRateProvider::new("live", SourceFamily::BlackMarket));
        let p2 = Arc::new(MockRateProvider::new("snapshot", SourceFamily::BlackMarket));
        let p3 = Arc::new(MockRateProvider::new("other", SourceFamily::BlackMarket));

        p1.fail("USD", "IRT", ProviderError::Timeout);
        p2.set_quote("USD", "IRT", Some(dec!(90000)), Some(dec!(91000)));
        p3.set_quote("USD", "IRT", Some(dec!(1)), Some(dec!(1)));

        let chain = FallbackProvider::new(
            SourceId::new("black-market"),
            SourceFamily::BlackMarket,
            vec![p1.clone(), p2.clone(), p3.clone()],
        );

        let rate = chain
            .fetch(&CurrencyCode::usd(), &CurrencyCode::irt())
            .await
            .unwrap();

        assert_eq!(rate.sell, Some(dec!(91000)));
        assert_eq!(rate.source.as_str(), "snapshot");
        assert_eq!(p1.total_calls(), 1);
        assert_eq!(p3.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_fallback_provider_reports_last_error() {
        let p1 = Arc::new(MockRateProvider::new("a", SourceFamily::General));
        let p2 = Arc::new(MockRateProvider::new("b", SourceFamily::General));
        p1.fail("EUR", "GBP", ProviderError::NotListed);
        p2.fail("EUR", "GBP", ProviderError::NetworkFailure("down".into()));

        let chain = FallbackProvider::new(
            SourceId::new("general"),
            SourceFamily::General,
            vec![p1, p2],
        );
        let gbp = CurrencyCode::new("GBP").unwrap();

        let result = chain.fetch(&CurrencyCode::eur(), &gbp).await;

        assert_eq!(result, Err(ProviderError::NetworkFailure("down".into())));

        let empty = FallbackProvider::new(SourceId::new("none"), SourceFamily::General, vec![]);
        assert!(empty.is_empty());
        assert_eq!(
            empty.fetch(&CurrencyCode::eur(), &gbp).await,
            Err(ProviderError::NotListed)
        );
    }

    #[test]
    fn test_mock_provider_delay_and_clear() {
        let provider = MockRateProvider::general();
        provider.set_quote("GBP", "EUR", Some(dec!(1.18)), Some(dec!(1.18)));
        provider.set_delay(std::time::Duration::from_millis(5));
        let gbp = CurrencyCode::new("GBP").unwrap();

        let rate = tokio_test::assert_ok!(tokio_test::block_on(
            provider.fetch(&gbp, &CurrencyCode::eur())
        ));
        assert_eq!(rate.mid(), Some(dec!(1.18)));

        provider.clear();
        tokio_test::assert_err!(tokio_test::block_on(
            provider.fetch(&gbp, &CurrencyCode::eur())
        ));
        assert_eq!(provider.calls_for("GBP", "EUR"), 2);
    }
}
