//! Concrete rate providers.
//!
//! - [`BonbastProvider`]: black-market quotes from the `bonbast` CLI export.
//! - [`SnapshotProvider`]: black-market quotes from a scraper's live JSON file.
//! - [`OpenErApiProvider`]: general-purpose rates from open.er-api.com.

pub mod bonbast;
pub mod open_er_api;
pub mod snapshot;

pub use bonbast::{BonbastConfig, BonbastProvider};
pub use open_er_api::{OpenErApiConfig, OpenErApiProvider};
pub use snapshot::SnapshotProvider;

use nerkh_common::CurrencyCode;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

use crate::error::{ProviderError, ProviderResult};

/// Read a JSON number (or numeric string) without going through `f64`.
pub(crate) fn decimal_from_json(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
        }
        Value::String(s) => Decimal::from_str(s.trim().replace(',', "").as_str()).ok(),
        _ => None,
    }
}

/// Like [`decimal_from_json`], treating zero and negative values as absent.
pub(crate) fn positive_from_json(value: Option<&Value>) -> Option<Decimal> {
    value
        .and_then(decimal_from_json)
        .filter(|v| *v > Decimal::ZERO)
}

/// The non-IRT side of an IRT pair. Black-market sources list nothing else.
pub(crate) fn irt_counterpart<'a>(
    base: &'a CurrencyCode,
    quote: &'a CurrencyCode,
) -> ProviderResult<&'a CurrencyCode> {
    match (base.is_irt(), quote.is_irt()) {
        (false, true) => Ok(base),
        (true, false) => Ok(quote),
        _ => Err(ProviderError::NotListed),
    }
}
