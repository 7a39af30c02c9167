//! Per-source unit corrections.
//!
//! Some sources publish quotes "per 10 units" or "per 100 units" of a weak
//! currency. The table maps `(source, currency)` to the divisor that turns
//! such a raw number into a per-unit price. Adapters reading raw numbers
//! apply it before returning a [`Rate`].

use std::collections::HashMap;

use nerkh_common::{CurrencyCode, Rate, SourceId};
use rust_decimal::Decimal;

/// Static `(source, currency) -> divisor` table, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct UnitCorrectionTable {
    divisors: HashMap<(SourceId, CurrencyCode), Decimal>,
}

impl UnitCorrectionTable {
    /// Empty table (every divisor is one).
    pub fn empty() -> Self {
        Self::default()
    }

    /// The corrections known for the built-in sources.
    pub fn standard() -> Self {
        let mut table = Self::empty();
        for (code, divisor) in [("AMD", 10), ("JPY", 10), ("IQD", 100)] {
            table = table.with(SourceId::bonbast(), code, divisor);
        }
        for code in ["JPY", "KRW", "SYP", "AMD", "IQD"] {
            table = table.with(SourceId::alanchand(), code, 100);
        }
        table
    }

    /// Add or replace an entry. Divisors of zero are ignored.
    pub fn with(mut self, source: SourceId, code: &str, divisor: u32) -> Self {
        if divisor == 0 {
            return self;
        }
        if let Ok(code) = CurrencyCode::new(code) {
            self.divisors.insert((source, code), Decimal::from(divisor));
        }
        self
    }

    /// Divisor for a source's quotes of `code`.
    pub fn divisor(&self, source: &SourceId, code: &CurrencyCode) -> Decimal {
        self.divisors
            .get(&(source.clone(), code.clone()))
            .copied()
            .unwrap_or(Decimal::ONE)
    }

    /// Correct both sides of a rate whose `base` was quoted per N units.
    pub fn apply(&self, mut rate: Rate) -> Rate {
        let divisor = self.divisor(&rate.source, &rate.base);
        if divisor != Decimal::ONE {
            rate.buy = rate.buy.map(|v| v / divisor);
            rate.sell = rate.sell.map(|v| v / divisor);
        }
        rate
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.divisors.len()
    }

    /// Check if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.divisors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_standard_table() {
        let table = UnitCorrectionTable::standard();
        let bonbast = SourceId::bonbast();

        assert_eq!(table.divisor(&bonbast, &CurrencyCode::new("JPY").unwrap()), dec!(10));
        assert_eq!(table.divisor(&bonbast, &CurrencyCode::new("IQD").unwrap()), dec!(100));
        assert_eq!(table.divisor(&bonbast, &CurrencyCode::eur()), Decimal::ONE);
        assert_eq!(
            table.divisor(&SourceId::alanchand(), &CurrencyCode::new("KRW").unwrap()),
            dec!(100)
        );
        assert_eq!(table.len(), 8);
    }

    #[test]
    fn test_apply_keeps_missing_side() {
        let table = UnitCorrectionTable::standard();
        let rate = Rate::new(
            SourceId::bonbast(),
            CurrencyCode::new("AMD").unwrap(),
            CurrencyCode::irt(),
            None,
            Some(dec!(1450)),
        );

        let corrected = table.apply(rate);

        assert_eq!(corrected.buy, None);
        assert_eq!(corrected.sell, Some(dec!(145)));
    }

    #[test]
    fn test_zero_divisor_ignored() {
        let table = UnitCorrectionTable::empty().with(SourceId::tgju(), "JPY", 0);
        assert!(table.is_empty());
    }
}
