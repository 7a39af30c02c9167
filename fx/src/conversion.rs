//! Conversion request and result types.

use nerkh_common::CurrencyCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConversionFailure;

/// Request to convert `amount` of `from` into `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    /// Amount to convert. Must be positive.
    pub amount: Decimal,
    /// Source currency.
    pub from: CurrencyCode,
    /// Target currency.
    pub to: CurrencyCode,
}

impl ConversionRequest {
    /// Create a new conversion request.
    pub fn new(amount: Decimal, from: CurrencyCode, to: CurrencyCode) -> Self {
        Self { amount, from, to }
    }

    /// Build a request from raw user input.
    pub fn parse(amount: &str, from: &str, to: &str) -> Result<Self, ConversionFailure> {
        let cleaned: String = amount.chars().filter(|c| *c != ',').collect();
        let amount = Decimal::from_str(cleaned.trim())
            .map_err(|e| ConversionFailure::InvalidRequest(format!("amount {amount:?}: {e}")))?;
        let from = CurrencyCode::new(from)
            .map_err(|e| ConversionFailure::InvalidRequest(e.to_string()))?;
        let to =
            CurrencyCode::new(to).map_err(|e| ConversionFailure::InvalidRequest(e.to_string()))?;
        Ok(Self::new(amount, from, to))
    }

    /// Check the amount is positive and both currencies are supported.
    pub fn validate(&self, supported: &[CurrencyCode]) -> Result<(), ConversionFailure> {
        if self.amount <= Decimal::ZERO {
            return Err(ConversionFailure::InvalidRequest(format!(
                "amount must be positive, got {}",
                self.amount
            )));
        }
        for code in [&self.from, &self.to] {
            if !supported.contains(code) {
                return Err(ConversionFailure::InvalidRequest(format!(
                    "unsupported currency {code}"
                )));
            }
        }
        Ok(())
    }

    /// Whether either side is the Toman.
    pub fn involves_irt(&self) -> bool {
        self.from.is_irt() || self.to.is_irt()
    }
}

/// Resolution step that produced a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "via", rename_all = "snake_case")]
pub enum Route {
    /// Source and target are the same currency.
    SameCurrency,
    /// Direct black-market quote for the IRT pair.
    Direct,
    /// Two hops through an intermediate currency.
    Bridge(CurrencyCode),
    /// Direct quote from the general-purpose source.
    Global,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::SameCurrency => write!(f, "same-currency"),
            Route::Direct => write!(f, "direct"),
            Route::Bridge(via) => write!(f, "bridge-{}", via.code().to_ascii_lowercase()),
            Route::Global => write!(f, "global"),
        }
    }
}

/// Outcome of a successful conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    /// Converted amount, unrounded.
    pub amount: Decimal,
    /// Amount formatted for the target currency.
    pub display: String,
    /// Target currency.
    pub currency: CurrencyCode,
    /// Whether any rate used had passed its cache lifetime.
    pub is_stale: bool,
    /// Step that produced the result.
    pub route: Route,
}

#[cfg(test)]
mod tests {
    use super::*;
    use nerkh_common::supported_currencies;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_request() {
        let request = ConversionRequest::parse("1,000,000", "irt", "Eur").unwrap();

        assert_eq!(request.amount, dec!(1000000));
        assert_eq!(request.from, CurrencyCode::irt());
        assert_eq!(request.to, CurrencyCode::eur());
        assert!(request.involves_irt());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            ConversionRequest::parse("ten", "EUR", "IRT"),
            Err(ConversionFailure::InvalidRequest(_))
        ));
        assert!(matches!(
            ConversionRequest::parse("10", "E", "IRT"),
            Err(ConversionFailure::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_validate() {
        let supported = supported_currencies();

        let ok = ConversionRequest::new(dec!(10), CurrencyCode::eur(), CurrencyCode::irt());
        assert!(ok.validate(&supported).is_ok());

        let zero = ConversionRequest::new(dec!(0), CurrencyCode::eur(), CurrencyCode::irt());
        assert!(zero.validate(&supported).is_err());

        let negative = ConversionRequest::new(dec!(-5), CurrencyCode::eur(), CurrencyCode::irt());
        assert!(negative.validate(&supported).is_err());

        let unknown = ConversionRequest::new(
            dec!(10),
            CurrencyCode::new("XYZ").unwrap(),
            CurrencyCode::irt(),
        );
        assert!(unknown.validate(&supported).is_err());
    }

    #[test]
    fn test_route_display() {
        assert_eq!(Route::Bridge(CurrencyCode::eur()).to_string(), "bridge-eur");
        assert_eq!(Route::Global.to_string(), "global");
    }
}
