//! Nerkh FX Engine
//!
//! Rate-resolution engine for currency conversion where one currency, the
//! Iranian Toman (IRT), has no usable official rate and must be priced from
//! black-market quote sources.
//!
//! # Features
//!
//! - Pluggable rate providers (CLI export, scraped snapshot file, public API)
//! - Per-source unit corrections for quotes published "per N units"
//! - Rate caching with per-family TTL and stale fallback
//! - Coalescing of concurrent fetches for the same pair
//! - Ordered fallback chain: direct, EUR bridge, USD bridge, global pair
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use nerkh_fx::{ConversionRequest, EngineConfig, ResolutionEngine};
//! use nerkh_fx::adapters::{BonbastProvider, OpenErApiProvider};
//!
//! let engine = ResolutionEngine::new(
//!     Arc::new(BonbastProvider::default()),
//!     Arc::new(OpenErApiProvider::default()),
//!     EngineConfig::from_env()?,
//! );
//!
//! let request = ConversionRequest::parse("100", "EUR", "IRT")?;
//! let result = engine.resolve(request).await?;
//! println!("{}", result.display);
//! ```

pub mod adapters;
pub mod cache;
pub mod config;
pub mod conversion;
pub mod correction;
pub mod engine;
pub mod error;
pub mod format;
pub mod inflight;
pub mod provider;

pub use cache::{CacheKey, RateCache};
pub use config::EngineConfig;
pub use conversion::{ConversionRequest, ConversionResult, Route};
pub use correction::UnitCorrectionTable;
pub use engine::ResolutionEngine;
pub use error::{ConfigError, ConversionFailure, ProviderError, ProviderResult};
pub use format::{format_amount, parse_display};
pub use provider::{FallbackProvider, RateProvider};
