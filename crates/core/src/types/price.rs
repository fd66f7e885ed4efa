//! Type-safe money representation.
//!
//! The commerce engine reports every price as an integer number of minor
//! currency units (cents for USD). [`Money`] keeps that integer as the source
//! of truth and only goes through `rust_decimal` for display.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An amount of money in minor units with its currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's minor unit (e.g., cents).
    pub minor: i64,
    /// ISO 4217 currency code.
    pub currency: CurrencyCode,
}

impl Money {
    /// Create a new amount from minor units.
    #[must_use]
    pub const fn from_minor(minor: i64, currency: CurrencyCode) -> Self {
        Self { minor, currency }
    }

    /// A zero amount in the given currency.
    #[must_use]
    pub const fn zero(currency: CurrencyCode) -> Self {
        Self { minor: 0, currency }
    }

    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    #[must_use]
    pub fn amount(&self) -> Decimal {
        Decimal::new(self.minor, self.currency.minor_digits())
    }

    /// Add two amounts of the same currency.
    ///
    /// Returns `None` on currency mismatch or overflow.
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        if self.currency != other.currency {
            return None;
        }
        self.minor
            .checked_add(other.minor)
            .map(|minor| Self::from_minor(minor, self.currency))
    }

    /// Multiply a unit price by a quantity.
    #[must_use]
    pub fn checked_mul(self, quantity: u32) -> Option<Self> {
        self.minor
            .checked_mul(i64::from(quantity))
            .map(|minor| Self::from_minor(minor, self.currency))
    }

    /// Format for display (e.g., "$19.99").
    #[must_use]
    pub fn display(&self) -> String {
        let digits = self.currency.minor_digits();
        let amount = self.amount();
        let separator = if matches!(self.currency, CurrencyCode::Other(_)) {
            " "
        } else {
            ""
        };
        format!(
            "{}{separator}{:.prec$}",
            self.currency.symbol(),
            amount,
            prec = digits as usize
        )
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// ISO 4217 currency codes.
///
/// Serialized as the upper-case code the engine uses in `currencyCode`.
/// Codes without a named variant decode to [`CurrencyCode::Other`] so a
/// channel in an unlisted currency still renders its prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
    JPY,
    /// Any other three-letter code, upper-cased. Assumed to have two minor
    /// digits.
    Other([u8; 3]),
}

impl CurrencyCode {
    /// Display symbol. Unlisted currencies use their code.
    #[must_use]
    pub fn symbol(&self) -> &str {
        match self {
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
            Self::JPY => "¥",
            Self::Other(_) => self.code(),
        }
    }

    /// Upper-case ISO code.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::CAD => "CAD",
            Self::AUD => "AUD",
            Self::JPY => "JPY",
            // only ever built from ASCII letters
            Self::Other(code) => core::str::from_utf8(code).unwrap_or("XXX"),
        }
    }

    /// Number of minor-unit digits.
    #[must_use]
    pub const fn minor_digits(self) -> u32 {
        match self {
            Self::JPY => 0,
            _ => 2,
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        match upper.as_str() {
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "CAD" => Ok(Self::CAD),
            "AUD" => Ok(Self::AUD),
            "JPY" => Ok(Self::JPY),
            _ => match <[u8; 3]>::try_from(upper.as_bytes()) {
                Ok(code) if code.iter().all(u8::is_ascii_uppercase) => Ok(Self::Other(code)),
                _ => Err(format!("invalid currency code: {s}")),
            },
        }
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<CurrencyCode> for String {
    fn from(currency: CurrencyCode) -> Self {
        currency.code().to_string()
    }
}
