//! Decimal-string monetary amounts.
//!
//! Amounts travel as text so no value ever passes through a binary float.
//! The ledger has emitted both JSON strings and JSON numbers for this field;
//! both decode, and encoding always produces a string.

use std::fmt;
use std::str::FromStr;

use serde::de::value::MapAccessDeserializer;
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Validation errors returned by [`Amount::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    /// Input was empty once trimmed.
    #[error("amount must not be empty")]
    Empty,
    /// Input is not an optionally signed decimal literal.
    #[error("amount `{value}` is not a decimal number")]
    NotDecimal {
        /// The rejected input, trimmed.
        value: String,
    },
}

/// Validated decimal amount such as `100`, `-3` or `12.50`.
///
/// # Examples
/// ```
/// use ledger_client::domain::Amount;
///
/// let amount = Amount::parse(" 12.50 ")?;
/// assert_eq!(amount.as_str(), "12.50");
/// assert!(Amount::parse("1e3").is_err());
/// # Ok::<(), ledger_client::domain::AmountError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Amount(String);

impl Amount {
    /// Parse and validate an amount, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError::Empty`] for blank input and
    /// [`AmountError::NotDecimal`] for anything other than digits with an
    /// optional leading `-` and an optional fractional part.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, AmountError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(AmountError::Empty);
        }
        if !is_decimal(trimmed) {
            return Err(AmountError::NotDecimal {
                value: trimmed.to_owned(),
            });
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// The zero amount used by fresh drafts.
    #[must_use]
    pub fn zero() -> Self {
        Self("0".to_owned())
    }

    /// Borrow the decimal text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

fn is_decimal(value: &str) -> bool {
    let unsigned = value.strip_prefix('-').unwrap_or(value);
    let (whole, fraction) = match unsigned.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (unsigned, None),
    };
    let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|byte| byte.is_ascii_digit());
    all_digits(whole) && fraction.is_none_or(all_digits)
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Amount {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

struct AmountVisitor;

impl<'de> Visitor<'de> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a decimal amount as a string or number")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Amount, E> {
        Amount::parse(value).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Amount, E> {
        Ok(Amount(value.to_string()))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Amount, E> {
        Ok(Amount(value.to_string()))
    }

    // serde_json hands over arbitrary-precision numbers as a single-entry map
    // holding the literal digits.
    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Amount, A::Error> {
        let number = serde_json::Number::deserialize(MapAccessDeserializer::new(map))?;
        Amount::parse(number.to_string()).map_err(de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(AmountVisitor)
    }
}
