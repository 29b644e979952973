// Rust guideline compliant 2026-10-16

//! Currency codes and minor-unit conversion.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::ValueError;

/// Number of decimal places assumed for every provider amount.
///
/// Amounts arrive in minor units (cents, fils, ...) and are divided by
/// `10^MINOR_UNIT_SCALE` to obtain the major-unit value.
pub const MINOR_UNIT_SCALE: u32 = 2;

/// ISO 4217 codes without a minor unit.
///
/// The minor-unit conversion above would be off by a factor of 100 for these,
/// so they are refused at configuration time.
const ZERO_DECIMAL_CURRENCIES: &[&str] = &[
    "BIF", "CLP", "DJF", "GNF", "JPY", "KMF", "KRW", "MGA", "PYG", "RWF", "UGX", "VND", "VUV",
    "XAF", "XOF", "XPF",
];

/// A validated three-letter currency code, stored upper-case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Currency(String);

impl Currency {
    /// Parse and validate a currency code.
    ///
    /// Accepts any casing (`"aed"`, `"AED"`) and surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::InvalidCurrency`] unless the code is exactly three
    /// ASCII letters, or [`ValueError::ZeroDecimalCurrency`] for currencies
    /// without a two-decimal minor unit.
    pub fn parse(code: &str) -> Result<Self, ValueError> {
        let trimmed = code.trim();
        if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValueError::InvalidCurrency { code: code.to_owned() });
        }
        let upper = trimmed.to_ascii_uppercase();
        if ZERO_DECIMAL_CURRENCIES.contains(&upper.as_str()) {
            return Err(ValueError::ZeroDecimalCurrency { code: upper });
        }
        Ok(Self(upper))
    }

    /// The upper-case code, e.g. `"AED"`.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison against a raw provider code (`"aed"`).
    #[must_use]
    pub fn matches(&self, raw: &str) -> bool {
        self.0.eq_ignore_ascii_case(raw.trim())
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Currency {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Convert a provider minor-unit amount to a major-unit decimal.
///
/// `3000` becomes `30.00`.
#[must_use]
pub fn minor_to_major(amount_minor: i64) -> Decimal {
    Decimal::new(amount_minor, MINOR_UNIT_SCALE)
}
