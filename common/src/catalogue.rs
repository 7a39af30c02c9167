//! Supported-currency catalogue.

use crate::monetary::CurrencyCode;

/// Currencies offered for conversion, in display order, with their names.
const CATALOGUE: &[(&str, &str)] = &[
    ("IRT", "Iranian Toman (IRT)"),
    ("USD", "United States Dollar (USD)"),
    ("EUR", "Euro (EUR)"),
    ("GBP", "British Pound Sterling (GBP)"),
    ("TRY", "Turkish Lira (TRY)"),
    ("AED", "United Arab Emirates Dirham (AED)"),
    ("CAD", "Canadian Dollar (CAD)"),
    ("AUD", "Australian Dollar (AUD)"),
    ("CHF", "Swiss Franc (CHF)"),
    ("JPY", "Japanese Yen (JPY)"),
    ("CNY", "Chinese Yuan (CNY)"),
    ("RUB", "Russian Ruble (RUB)"),
    ("SAR", "Saudi Riyal (SAR)"),
    ("INR", "Indian Rupee (INR)"),
    ("KWD", "Kuwaiti Dinar (KWD)"),
    ("QAR", "Qatari Riyal (QAR)"),
    ("OMR", "Omani Rial (OMR)"),
    ("BHD", "Bahraini Dinar (BHD)"),
    ("SEK", "Swedish Krona (SEK)"),
    ("NOK", "Norwegian Krone (NOK)"),
];

/// The supported currencies in display order.
pub fn supported_currencies() -> Vec<CurrencyCode> {
    CATALOGUE
        .iter()
        .map(|(code, _)| CurrencyCode::known(code))
        .collect()
}

/// Display name of a currency, falling back to the code itself.
pub fn currency_name(code: &CurrencyCode) -> String {
    CATALOGUE
        .iter()
        .find(|(c, _)| *c == code.code())
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogue_order() {
        let codes = supported_currencies();
        assert_eq!(codes.len(), 20);
        assert_eq!(codes[0], CurrencyCode::irt());
        assert_eq!(codes[1], CurrencyCode::usd());
        assert_eq!(codes[2], CurrencyCode::eur());
        assert_eq!(codes.last().unwrap().code(), "NOK");
    }

    #[test]
    fn test_catalogue_codes_are_valid() {
        for code in supported_currencies() {
            assert_eq!(CurrencyCode::new(code.code()).unwrap(), code);
        }
    }

    #[test]
    fn test_currency_name() {
        assert_eq!(currency_name(&CurrencyCode::irt()), "Iranian Toman (IRT)");
        let unknown = CurrencyCode::new("XAU").unwrap();
        assert_eq!(currency_name(&unknown), "XAU");
    }
}
