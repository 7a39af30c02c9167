//! General-purpose rates from the open.er-api.com "latest" endpoint.

use async_trait::async_trait;
use chrono::DateTime;
use nerkh_common::{constants, CurrencyCode, DurationExt, Rate, SourceFamily, SourceId};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::positive_from_json;
use crate::error::{ProviderError, ProviderResult};
use crate::provider::RateProvider;

/// Endpoint settings.
#[derive(Debug, Clone)]
pub struct OpenErApiConfig {
    /// API root, without trailing slash.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for OpenErApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://open.er-api.com/v6".to_string(),
            timeout: constants::fetch_timeout().as_std(),
        }
    }
}

/// Rate provider backed by open.er-api.com.
///
/// The API publishes a single mid value per pair, so both sides of the
/// returned [`Rate`] carry it.
pub struct OpenErApiProvider {
    source: SourceId,
    client: reqwest::Client,
    config: OpenErApiConfig,
}

impl OpenErApiProvider {
    pub fn new(config: OpenErApiConfig) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("nerkh/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            source: SourceId::open_er_api(),
            client,
            config,
        }
    }

    fn latest_url(&self, base: &CurrencyCode) -> String {
        format!(
            "{}/latest/{}",
            self.config.base_url.trim_end_matches('/'),
            base
        )
    }
}

impl Default for OpenErApiProvider {
    fn default() -> Self {
        Self::new(OpenErApiConfig::default())
    }
}

#[async_trait]
impl RateProvider for OpenErApiProvider {
    fn source(&self) -> &SourceId {
        &self.source
    }

    fn family(&self) -> SourceFamily {
        SourceFamily::General
    }

    async fn fetch(&self, base: &CurrencyCode, quote: &CurrencyCode) -> ProviderResult<Rate> {
        let url = self.latest_url(base);
        debug!(%url, "Requesting latest rates");

        let response = self
            .client
            .get(&url)
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::NetworkFailure(format!(
                "{url} returned {status}"
            )));
        }

        let body = response.text().await.map_err(transport_error)?;
        parse_latest(&body, &self.source, base, quote)
    }
}

fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::NetworkFailure(e.to_string())
    }
}

/// Extract `base/quote` from a "latest" response body.
pub fn parse_latest(
    body: &str,
    source: &SourceId,
    base: &CurrencyCode,
    quote: &CurrencyCode,
) -> ProviderResult<Rate> {
    let document: Value = serde_json::from_str(body)
        .map_err(|e| ProviderError::ParseFailure(format!("invalid response JSON: {e}")))?;

    if document.get("result").and_then(Value::as_str) != Some("success") {
        return Err(ProviderError::NotListed);
    }

    let rates = document
        .get("rates")
        .and_then(Value::as_object)
        .ok_or_else(|| ProviderError::ParseFailure("response has no rates table".into()))?;

    let value = match rates.get(quote.code()) {
        None => return Err(ProviderError::NotListed),
        Some(value) => positive_from_json(Some(value)).ok_or_else(|| {
            ProviderError::ParseFailure(format!("rate for {quote} is not a positive number"))
        })?,
    };

    let rate = Rate::new(
        source.clone(),
        base.clone(),
        quote.clone(),
        Some(value),
        Some(value),
    );

    let updated = document
        .get("time_last_update_unix")
        .and_then(Value::as_i64)
        .and_then(|secs| DateTime::from_timestamp(secs, 0));

    Ok(match updated {
        Some(at) => rate.observed_at(at),
        None => rate,
    })
}
