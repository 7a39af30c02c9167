//! Display formatting of conversion results.
//!
//! - IRT: rounded to 2 decimal places; shown as an integer when that has no
//!   fractional part, otherwise with exactly 2 decimals.
//! - Anything else: rounded to 4 decimal places with trailing zeros (and a
//!   trailing decimal point) removed.
//!
//! Both use `,` as the thousands separator. Rounding happens here only,
//! never between conversion hops.

use nerkh_common::CurrencyCode;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

const IRT_DECIMALS: u32 = 2;
const DEFAULT_DECIMALS: u32 = 4;

/// Format `value` for display in `target`.
pub fn format_amount(value: Decimal, target: &CurrencyCode) -> String {
    let rounded = if target.is_irt() {
        let mut v =
            value.round_dp_with_strategy(IRT_DECIMALS, RoundingStrategy::MidpointAwayFromZero);
        if v.fract().is_zero() {
            v = v.trunc();
        } else {
            v.rescale(IRT_DECIMALS);
        }
        v
    } else {
        value
            .round_dp_with_strategy(DEFAULT_DECIMALS, RoundingStrategy::MidpointAwayFromZero)
            .normalize()
    };

    if rounded.is_zero() {
        return "0".to_string();
    }
    group_thousands(&rounded.to_string())
}

/// Parse a display string produced by [`format_amount`].
pub fn parse_display(display: &str) -> Option<Decimal> {
    let cleaned: String = display
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    Decimal::from_str(&cleaned).ok()
}

fn group_thousands(plain: &str) -> String {
    let (sign, unsigned) = match plain.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", plain),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(plain.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}
