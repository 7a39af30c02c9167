//! The rate-resolution engine.
//!
//! For each request the engine walks a fixed chain and stops at the first
//! step that yields an amount:
//!
//! 1. same currency: the amount itself, no provider call;
//! 2. direct black-market quote for an IRT pair;
//! 3. bridges through each configured intermediate currency (EUR, then
//!    USD by default), one leg from the general source and the IRT leg
//!    from the black-market source;
//! 4. direct quote from the general source (the only step for non-IRT
//!    pairs).
//!
//! IRT legs are asymmetric: turning IRT into foreign currency divides by
//! the source's buy price, turning foreign currency into IRT multiplies by
//! its sell price. All arithmetic is decimal and unrounded until display.

use std::sync::Arc;

use nerkh_common::{CurrencyCode, DurationExt, Rate};
use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

use crate::cache::{CacheKey, CacheStats, RateCache};
use crate::config::EngineConfig;
use crate::conversion::{ConversionRequest, ConversionResult, Route};
use crate::error::{ConversionFailure, ProviderError, ProviderResult};
use crate::format::format_amount;
use crate::inflight::InFlight;
use crate::provider::RateProvider;

/// Where a lookup may take its data from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Fresh cache entries, otherwise a live fetch.
    Live,
    /// Cache only, expired entries included.
    StaleAllowed,
}

/// A rate together with whether it came from an expired cache entry.
struct Quote {
    rate: Rate,
    stale: bool,
}

/// An amount produced by one chain step.
struct Resolved {
    amount: Decimal,
    route: Route,
    stale: bool,
}

/// The resolution engine. Stateless across requests apart from the shared
/// cache and the table of in-flight fetches.
pub struct ResolutionEngine {
    black_market: Arc<dyn RateProvider>,
    general: Arc<dyn RateProvider>,
    cache: Arc<RateCache>,
    inflight: Arc<InFlight>,
    config: EngineConfig,
}

impl ResolutionEngine {
    /// Create an engine with its own cache.
    pub fn new(
        black_market: Arc<dyn RateProvider>,
        general: Arc<dyn RateProvider>,
        config: EngineConfig,
    ) -> Self {
        Self::with_cache(black_market, general, Arc::new(RateCache::new()), config)
    }

    /// Create an engine over an existing cache.
    pub fn with_cache(
        black_market: Arc<dyn RateProvider>,
        general: Arc<dyn RateProvider>,
        cache: Arc<RateCache>,
        config: EngineConfig,
    ) -> Self {
        Self {
            black_market,
            general,
            cache,
            inflight: Arc::new(InFlight::new()),
            config,
        }
    }

    /// Convert an amount between two currencies.
    #[instrument(skip_all, fields(
        amount = %request.amount,
        from = %request.from,
        to = %request.to
    ))]
    pub async fn resolve(
        &self,
        request: ConversionRequest,
    ) -> Result<ConversionResult, ConversionFailure> {
        request.validate(&self.config.supported)?;

        if request.from == request.to {
            return Ok(self.finish(&request, request.amount, Route::SameCurrency, false));
        }

        if let Some(resolved) = self.run_chain(&request, Mode::Live).await {
            return Ok(self.finish(&request, resolved.amount, resolved.route, resolved.stale));
        }

        if self.config.allow_stale {
            debug!("Live resolution failed, retrying against expired cache entries");
            if let Some(resolved) = self.run_chain(&request, Mode::StaleAllowed).await {
                return Ok(self.finish(&request, resolved.amount, resolved.route, resolved.stale));
            }
        }

        warn!("All conversion methods failed");
        Err(ConversionFailure::NoRateAvailable)
    }

    /// Currencies accepted by [`ResolutionEngine::resolve`], in display order.
    pub fn list_supported_currencies(&self) -> Vec<CurrencyCode> {
        self.config.supported.clone()
    }

    /// Get engine statistics.
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            cache_stats: self.cache.stats(),
            fetches_in_flight: self.inflight.len(),
        }
    }

    fn finish(
        &self,
        request: &ConversionRequest,
        amount: Decimal,
        route: Route,
        is_stale: bool,
    ) -> ConversionResult {
        let shown = format_amount(amount, &request.to);

        info!(
            route = %route,
            result = %shown,
            stale = is_stale,
            "Conversion completed"
        );

        ConversionResult {
            amount,
            display: shown,
            currency: request.to.clone(),
            is_stale,
            route,
        }
    }

    async fn run_chain(&self, request: &ConversionRequest, mode: Mode) -> Option<Resolved> {
        if request.involves_irt() {
            if let Some(resolved) = self.direct(request, mode).await {
                return Some(resolved);
            }

            let foreign = foreign_side(request);
            for via in &self.config.bridge_currencies {
                if via == foreign {
                    continue;
                }
                debug!(via = %via, "Trying bridge conversion");
                if let Some(resolved) = self.bridge(request, via, mode).await {
                    return Some(resolved);
                }
            }
        }

        self.global(request, mode).await
    }

    /// Step 2: the black-market quote of the foreign side against IRT.
    async fn direct(&self, request: &ConversionRequest, mode: Mode) -> Option<Resolved> {
        let foreign = foreign_side(request);
        let quote = self.black_market_quote(foreign, mode).await?;
        let amount = irt_leg(request.amount, request.from.is_irt(), &quote.rate)?;

        Some(Resolved {
            amount,
            route: Route::Direct,
            stale: quote.stale,
        })
    }

    /// Step 3: two hops through `via`.
    async fn bridge(
        &self,
        request: &ConversionRequest,
        via: &CurrencyCode,
        mode: Mode,
    ) -> Option<Resolved> {
        let (amount, stale) = if request.from.is_irt() {
            let irt_quote = self.black_market_quote(via, mode).await?;
            let intermediate = irt_leg(request.amount, true, &irt_quote.rate)?;
            let general_quote = self.general_quote(via, &request.to, mode).await?;
            let amount = general_leg(intermediate, &general_quote.rate)?;
            (amount, irt_quote.stale || general_quote.stale)
        } else {
            let general_quote = self.general_quote(&request.from, via, mode).await?;
            let intermediate = general_leg(request.amount, &general_quote.rate)?;
            let irt_quote = self.black_market_quote(via, mode).await?;
            let amount = irt_leg(intermediate, false, &irt_quote.rate)?;
            (amount, irt_quote.stale || general_quote.stale)
        };

        Some(Resolved {
            amount,
            route: Route::Bridge(via.clone()),
            stale,
        })
    }

    /// Step 4: the general source's quote for the requested pair.
    async fn global(&self, request: &ConversionRequest, mode: Mode) -> Option<Resolved> {
        let quote = self.general_quote(&request.from, &request.to, mode).await?;
        let amount = general_leg(request.amount, &quote.rate)?;

        Some(Resolved {
            amount,
            route: Route::Global,
            stale: quote.stale,
        })
    }

    async fn black_market_quote(&self, foreign: &CurrencyCode, mode: Mode) -> Option<Quote> {
        self.quote(&self.black_market, foreign, &CurrencyCode::irt(), mode)
            .await
    }

    async fn general_quote(
        &self,
        base: &CurrencyCode,
        quote: &CurrencyCode,
        mode: Mode,
    ) -> Option<Quote> {
        self.quote(&self.general, base, quote, mode).await
    }

    async fn quote(
        &self,
        provider: &Arc<dyn RateProvider>,
        base: &CurrencyCode,
        quote: &CurrencyCode,
        mode: Mode,
    ) -> Option<Quote> {
        let key = CacheKey::new(provider.source().clone(), base.clone(), quote.clone());

        if let Some(rate) = self.cache.get(&key) {
            return Some(Quote { rate, stale: false });
        }

        match mode {
            Mode::StaleAllowed => self
                .cache
                .get_stale_allowed(&key)
                .map(|rate| Quote { rate, stale: true }),
            Mode::Live => match self.fetch(provider, key.clone()).await {
                Ok(rate) => Some(Quote { rate, stale: false }),
                Err(e) => {
                    warn!(
                        key = %key,
                        family = %provider.family(),
                        reason = e.reason(),
                        error = %e,
                        "Provider failed to return rate"
                    );
                    None
                }
            },
        }
    }

    /// Fetch through the in-flight table so concurrent misses on one key
    /// share a single upstream call. Successful quotes are cached by the
    /// fetch task itself, so they land even if every waiter gave up.
    async fn fetch(&self, provider: &Arc<dyn RateProvider>, key: CacheKey) -> ProviderResult<Rate> {
        let timeout = self.config.fetch_timeout.as_std();
        let ttl = self.config.ttl_for(provider.family());
        let provider = Arc::clone(provider);
        let cache = Arc::clone(&self.cache);
        let fetch_key = key.clone();

        self.inflight
            .run(key, timeout, move || async move {
                let fetched =
                    tokio::time::timeout(timeout, provider.fetch(&fetch_key.base, &fetch_key.quote))
                        .await
                        .unwrap_or(Err(ProviderError::Timeout));
                if let Ok(rate) = &fetched {
                    debug!(key = %fetch_key, source = %rate.source, "Fetched rate from provider");
                    cache.put(fetch_key, rate.clone(), ttl);
                }
                fetched
            })
            .await
    }
}

/// Engine statistics.
#[derive(Debug, Clone)]
pub struct EngineStats {
    pub cache_stats: CacheStats,
    pub fetches_in_flight: usize,
}

/// The non-IRT side of a request that involves IRT.
fn foreign_side(request: &ConversionRequest) -> &CurrencyCode {
    if request.from.is_irt() {
        &request.to
    } else {
        &request.from
    }
}

/// Convert across a black-market `X/IRT` quote.
///
/// Leaving IRT divides by the buy price; entering IRT multiplies by the
/// sell price. A missing or non-positive side makes the leg unusable.
fn irt_leg(amount: Decimal, from_irt: bool, rate: &Rate) -> Option<Decimal> {
    if from_irt {
        amount.checked_div(rate.usable_buy()?)
    } else {
        amount.checked_mul(rate.usable_sell()?)
    }
}

/// Convert across a general-source quote using its mid value.
fn general_leg(amount: Decimal, rate: &Rate) -> Option<Decimal> {
    amount.checked_mul(rate.mid()?)
}
