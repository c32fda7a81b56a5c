//! Currency codes and directional currency pairs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{RatesError, Result};

/// Length of an ISO 4217 alphabetic currency code.
pub const CURRENCY_CODE_LEN: usize = 3;

/// Separator between base and quote in the textual pair form.
pub const PAIR_SEPARATOR: char = '/';

/// ISO 4217 style currency code: exactly three ASCII letters, uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Create a currency from a code, normalizing it to uppercase.
    pub fn new(code: impl AsRef<str>) -> Result<Self> {
        let code = code.as_ref();
        if code.len() != CURRENCY_CODE_LEN || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(RatesError::InvalidPair(format!(
                "currency code must be {} letters, got '{}'",
                CURRENCY_CODE_LEN, code
            )));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    /// Get the currency code.
    pub fn code(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Currency {
    type Err = RatesError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for Currency {
    type Error = RatesError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.0
    }
}

/// A directional currency pair: `base/quote` is not `quote/base`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CurrencyPair {
    /// Base currency (the one being priced).
    pub base: Currency,
    /// Quote currency (the pricing currency).
    pub quote: Currency,
}

impl CurrencyPair {
    /// Create a new currency pair.
    pub fn new(base: Currency, quote: Currency) -> Self {
        Self { base, quote }
    }

    /// Build a pair from two raw codes.
    pub fn from_codes(base: &str, quote: &str) -> Result<Self> {
        Ok(Self::new(Currency::new(base)?, Currency::new(quote)?))
    }

    /// Parse the textual `XXX/YYY` form, case-insensitively.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || {
            RatesError::InvalidPair(format!(
                "invalid currency pair format: expected 'XXX/YYY', got '{}'",
                input
            ))
        };

        if input.len() != CURRENCY_CODE_LEN * 2 + 1 {
            return Err(invalid());
        }

        let (base, quote) = input.split_once(PAIR_SEPARATOR).ok_or_else(invalid)?;
        Self::from_codes(base, quote).map_err(|_| invalid())
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.base, PAIR_SEPARATOR, self.quote)
    }
}

impl FromStr for CurrencyPair {
    type Err = RatesError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
