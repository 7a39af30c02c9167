//! Currency codes and quoted rates.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CodeError;
use crate::identifiers::SourceId;
use crate::time::{now, Timestamp};

/// Currency identifier: ISO 4217 where one exists, plus the synthetic `IRT`.
///
/// Codes are normalised to uppercase on construction, so equality is an
/// exact match on the normalised form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Code of the Iranian Toman.
    pub const IRT: &'static str = "IRT";

    /// Create a currency code, normalising to uppercase.
    pub fn new(code: impl AsRef<str>) -> Result<Self, CodeError> {
        let trimmed = code.as_ref().trim();
        if trimmed.is_empty() {
            return Err(CodeError::Empty);
        }
        if !(3..=4).contains(&trimmed.chars().count()) {
            return Err(CodeError::InvalidLength(trimmed.to_string()));
        }
        if !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CodeError::InvalidCharacters(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Build from a literal already known to be valid.
    pub(crate) fn known(code: &'static str) -> Self {
        Self(code.to_string())
    }

    /// Get the currency code.
    pub fn code(&self) -> &str {
        &self.0
    }

    /// Whether this is the Toman.
    pub fn is_irt(&self) -> bool {
        self.0 == Self::IRT
    }

    /// Common currencies
    pub fn irt() -> Self {
        Self::known(Self::IRT)
    }

    pub fn usd() -> Self {
        Self::known("USD")
    }

    pub fn eur() -> Self {
        Self::known("EUR")
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CurrencyCode {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = CodeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

/// A quoted rate for one currency pair from one source.
///
/// `buy` and `sell` are the amounts of `quote` per single unit of `base`.
/// Either side may be missing when the source only publishes one. An
/// inverted quote (`sell < buy`) is kept as given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rate {
    /// Source that published the quote.
    pub source: SourceId,
    /// Currency being priced.
    pub base: CurrencyCode,
    /// Currency the price is expressed in.
    pub quote: CurrencyCode,
    /// Price the source pays for one unit of `base`.
    pub buy: Option<Decimal>,
    /// Price the source charges for one unit of `base`.
    pub sell: Option<Decimal>,
    /// When the quote was observed upstream.
    pub observed_at: Timestamp,
}

impl Rate {
    /// Create a rate observed now.
    pub fn new(
        source: SourceId,
        base: CurrencyCode,
        quote: CurrencyCode,
        buy: Option<Decimal>,
        sell: Option<Decimal>,
    ) -> Self {
        Self {
            source,
            base,
            quote,
            buy,
            sell,
            observed_at: now(),
        }
    }

    /// Override the observation time.
    pub fn observed_at(mut self, at: Timestamp) -> Self {
        self.observed_at = at;
        self
    }

    /// Buy side, if present and positive.
    pub fn usable_buy(&self) -> Option<Decimal> {
        self.buy.filter(|v| v.is_sign_positive() && !v.is_zero())
    }

    /// Sell side, if present and positive.
    pub fn usable_sell(&self) -> Option<Decimal> {
        self.sell.filter(|v| v.is_sign_positive() && !v.is_zero())
    }

    /// Mid-market value: the average of both usable sides, or whichever
    /// side is usable.
    pub fn mid(&self) -> Option<Decimal> {
        match (self.usable_buy(), self.usable_sell()) {
            (Some(buy), Some(sell)) => Some((buy + sell) / Decimal::TWO),
            (Some(one), None) | (None, Some(one)) => Some(one),
            (None, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_code_normalisation() {
        let code = CurrencyCode::new(" eur ").unwrap();
        assert_eq!(code, CurrencyCode::eur());
        assert_eq!(code.code(), "EUR");
        assert!(CurrencyCode::new("irt").unwrap().is_irt());
        assert_eq!(CurrencyCode::new("usdt").unwrap().code(), "USDT");
    }

    #[test]
    fn test_code_rejects_malformed() {
        assert_eq!(CurrencyCode::new("  "), Err(CodeError::Empty));
        assert!(matches!(CurrencyCode::new("EU"), Err(CodeError::InvalidLength(_))));
        assert!(matches!(CurrencyCode::new("EUROS"), Err(CodeError::InvalidLength(_))));
        assert!(matches!(CurrencyCode::new("E1R"), Err(CodeError::InvalidCharacters(_))));
    }

    #[test]
    fn test_code_serde_validates() {
        let code: CurrencyCode = serde_json::from_str("\"gbp\"").unwrap();
        assert_eq!(code.code(), "GBP");
        assert!(serde_json::from_str::<CurrencyCode>("\"12\"").is_err());
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"GBP\"");
    }

    #[test]
    fn test_rate_sides() {
        let rate = Rate::new(
            SourceId::bonbast(),
            CurrencyCode::eur(),
            CurrencyCode::irt(),
            Some(dec!(100000)),
            Some(dec!(101000)),
        );
        assert_eq!(rate.usable_buy(), Some(dec!(100000)));
        assert_eq!(rate.mid(), Some(dec!(100500)));

        let one_sided = Rate {
            buy: None,
            sell: Some(dec!(0)),
            ..rate.clone()
        };
        assert_eq!(one_sided.usable_sell(), None);
        assert_eq!(one_sided.mid(), None);

        let inverted = Rate {
            buy: Some(dec!(5)),
            sell: Some(dec!(4)),
            ..rate
        };
        assert_eq!(inverted.usable_buy(), Some(dec!(5)));
        assert_eq!(inverted.usable_sell(), Some(dec!(4)));
    }
}
