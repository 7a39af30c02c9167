//! Black-market quotes from a scraper's live snapshot file.
//!
//! Scrapers write documents shaped like
//!
//! ```json
//! {
//!   "updated_at": "2025-06-01T10:00:00+00:00",
//!   "currencies": {
//!     "USD": {"buy": 89500, "sell": 90500, "timestamp": "2025-06-01T10:00:00+00:00"}
//!   }
//! }
//! ```
//!
//! with per-unit prices in Toman. Scrapers divide "per N units" quotes
//! before writing, so values are returned as read.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nerkh_common::{constants, CurrencyCode, DurationExt, Rate, SourceFamily, SourceId, Timestamp};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use super::{irt_counterpart, positive_from_json};
use crate::error::{ProviderError, ProviderResult};
use crate::provider::RateProvider;

/// Rate provider reading a snapshot file on every fetch.
pub struct SnapshotProvider {
    source: SourceId,
    path: PathBuf,
    timeout: Duration,
}

impl SnapshotProvider {
    pub fn new(source: SourceId, path: impl AsRef<Path>) -> Self {
        Self {
            source,
            path: path.as_ref().to_path_buf(),
            timeout: constants::fetch_timeout().as_std(),
        }
    }

    /// Bound each file read by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl RateProvider for SnapshotProvider {
    fn source(&self) -> &SourceId {
        &self.source
    }

    fn family(&self) -> SourceFamily {
        SourceFamily::BlackMarket
    }

    async fn fetch(&self, base: &CurrencyCode, quote: &CurrencyCode) -> ProviderResult<Rate> {
        let foreign = irt_counterpart(base, quote)?;

        let contents = tokio::time::timeout(self.timeout, tokio::fs::read_to_string(&self.path))
            .await
            .map_err(|_| ProviderError::Timeout)?
            .map_err(|e| {
                ProviderError::NetworkFailure(format!("{}: {e}", self.path.display()))
            })?;

        let rate = parse_snapshot(&contents, &self.source, foreign)?;
        debug!(
            source = %self.source,
            currency = %foreign,
            observed_at = %rate.observed_at,
            "Read snapshot quote"
        );
        Ok(rate)
    }
}

/// Extract the `foreign/IRT` quote from a snapshot document.
pub fn parse_snapshot(
    contents: &str,
    source: &SourceId,
    foreign: &CurrencyCode,
) -> ProviderResult<Rate> {
    let document: Value = serde_json::from_str(contents)
        .map_err(|e| ProviderError::ParseFailure(format!("invalid snapshot JSON: {e}")))?;

    let updated_at = document
        .get("updated_at")
        .ok_or_else(|| ProviderError::ParseFailure("snapshot missing updated_at".into()))?;
    let currencies = document
        .get("currencies")
        .and_then(Value::as_object)
        .ok_or_else(|| ProviderError::ParseFailure("snapshot missing currencies".into()))?;

    let entry = currencies
        .get(foreign.code())
        .ok_or(ProviderError::NotListed)?;

    let buy = positive_from_json(entry.get("buy"));
    let sell = positive_from_json(entry.get("sell"));
    if buy.is_none() && sell.is_none() {
        return Err(ProviderError::NotListed);
    }

    let observed_at = entry
        .get("timestamp")
        .and_then(parse_timestamp)
        .or_else(|| parse_timestamp(updated_at));

    let rate = Rate::new(
        source.clone(),
        foreign.clone(),
        CurrencyCode::irt(),
        buy,
        sell,
    );
    Ok(match observed_at {
        Some(at) => rate.observed_at(at),
        None => rate,
    })
}

fn parse_timestamp(value: &Value) -> Option<Timestamp> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}
