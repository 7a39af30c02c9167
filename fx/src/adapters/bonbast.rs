//! Black-market quotes from the `bonbast` command-line export.
//!
//! The helper prints one JSON object keyed by currency code, each entry
//! carrying `buy`, `sell` and `name`. Prices are in Toman, some of them per
//! 10 or 100 units of the foreign currency.

use async_trait::async_trait;
use nerkh_common::{constants, CurrencyCode, DurationExt, Rate, SourceFamily, SourceId};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use super::{irt_counterpart, positive_from_json};
use crate::correction::UnitCorrectionTable;
use crate::error::{ProviderError, ProviderResult};
use crate::provider::RateProvider;

/// Currencies the export lists. Coins and gold entries are ignored.
pub const BONBAST_CURRENCIES: &[&str] = &[
    "USD", "EUR", "GBP", "CHF", "CAD", "AUD", "SEK", "NOK", "RUB", "THB", "SGD", "HKD", "AZN",
    "AMD", "DKK", "AED", "JPY", "TRY", "CNY", "SAR", "INR", "MYR", "AFN", "KWD", "IQD", "BHD",
    "OMR", "QAR",
];

/// How to run the export helper.
#[derive(Debug, Clone)]
pub struct BonbastConfig {
    /// Program to spawn.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<String>,
    /// Longest the helper may run.
    pub timeout: Duration,
}

impl Default for BonbastConfig {
    fn default() -> Self {
        Self {
            program: "python".to_string(),
            args: vec!["-m".into(), "bonbast".into(), "export".into()],
            timeout: constants::fetch_timeout().as_std(),
        }
    }
}

/// Rate provider backed by the bonbast export.
pub struct BonbastProvider {
    source: SourceId,
    config: BonbastConfig,
    corrections: Arc<UnitCorrectionTable>,
}

impl BonbastProvider {
    pub fn new(config: BonbastConfig, corrections: Arc<UnitCorrectionTable>) -> Self {
        Self {
            source: SourceId::bonbast(),
            config,
            corrections,
        }
    }

    async fn export(&self) -> ProviderResult<String> {
        let mut command = Command::new(&self.config.program);
        command.args(&self.config.args).kill_on_drop(true);

        let output = tokio::time::timeout(self.config.timeout, command.output())
            .await
            .map_err(|_| ProviderError::Timeout)?
            .map_err(|e| {
                ProviderError::NetworkFailure(format!(
                    "failed to run {}: {e}",
                    self.config.program
                ))
            })?;

        if !output.status.success() {
            return Err(ProviderError::NetworkFailure(format!(
                "{} exited with {}",
                self.config.program, output.status
            )));
        }

        String::from_utf8(output.stdout)
            .map_err(|e| ProviderError::ParseFailure(format!("export is not UTF-8: {e}")))
    }
}

impl Default for BonbastProvider {
    fn default() -> Self {
        Self::new(
            BonbastConfig::default(),
            Arc::new(UnitCorrectionTable::standard()),
        )
    }
}

#[async_trait]
impl RateProvider for BonbastProvider {
    fn source(&self) -> &SourceId {
        &self.source
    }

    fn family(&self) -> SourceFamily {
        SourceFamily::BlackMarket
    }

    async fn fetch(&self, base: &CurrencyCode, quote: &CurrencyCode) -> ProviderResult<Rate> {
        let foreign = irt_counterpart(base, quote)?;
        if !BONBAST_CURRENCIES.contains(&foreign.code()) {
            return Err(ProviderError::NotListed);
        }

        let export = self.export().await?;
        let rate = parse_export(&export, &self.source, foreign, &self.corrections)?;

        debug!(
            currency = %foreign,
            buy = ?rate.buy,
            sell = ?rate.sell,
            "Parsed bonbast quote"
        );
        Ok(rate)
    }
}

/// Extract the corrected `foreign/IRT` quote from an export document.
pub fn parse_export(
    export: &str,
    source: &SourceId,
    foreign: &CurrencyCode,
    corrections: &UnitCorrectionTable,
) -> ProviderResult<Rate> {
    let document: Value = serde_json::from_str(export.trim())
        .map_err(|e| ProviderError::ParseFailure(format!("invalid export JSON: {e}")))?;
    let entries = document
        .as_object()
        .ok_or_else(|| ProviderError::ParseFailure("export is not a JSON object".into()))?;
    let entry = entries
        .get(foreign.code())
        .ok_or(ProviderError::NotListed)?;

    let buy = positive_from_json(entry.get("buy"));
    let sell = positive_from_json(entry.get("sell"));
    if buy.is_none() && sell.is_none() {
        return Err(ProviderError::NotListed);
    }

    let raw = Rate::new(
        source.clone(),
        foreign.clone(),
        CurrencyCode::irt(),
        buy,
        sell,
    );
    Ok(corrections.apply(raw))
}
