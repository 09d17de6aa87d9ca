//! Type-safe price representation using decimal arithmetic.
//!
//! Prices are kept as `Decimal` in the currency's standard unit (euros, not
//! cents). Conversion to integer minor units happens once, at the payment
//! boundary, and always rounds to the nearest unit.

use std::fmt;
use std::ops::{Add, Mul};
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while building or converting a price.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceError {
    /// Prices are never negative.
    #[error("price must not be negative: {0}")]
    Negative(Decimal),

    /// The amount does not fit in an `i64` once expressed in minor units.
    #[error("price {0} overflows minor currency units")]
    Overflow(Decimal),

    /// Unknown ISO 4217 code.
    #[error("unsupported currency code: {0}")]
    UnknownCurrency(String),
}

/// A non-negative amount in a currency's standard unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Largest representable amount, used as an unbounded price ceiling.
    pub const MAX: Self = Self(Decimal::MAX);

    /// Create a new price.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` for amounts below zero.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(amount));
        }
        Ok(Self(amount))
    }

    /// Build a price from minor units (e.g., cents).
    #[must_use]
    pub fn from_minor_units(units: u32) -> Self {
        Self(Decimal::new(i64::from(units), 2))
    }

    /// The amount in the currency's standard unit.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Amount in integer minor units, rounded half away from zero.
    ///
    /// `9.995` becomes `1000`, never `999`.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Overflow` if the result does not fit in an `i64`.
    pub fn to_minor_units(&self, currency: CurrencyCode) -> Result<i64, PriceError> {
        let scale = Decimal::from(10_i64.pow(currency.minor_unit_exponent()));
        self.0
            .checked_mul(scale)
            .map(|scaled| scaled.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
            .and_then(|rounded| rounded.to_i64())
            .ok_or(PriceError::Overflow(self.0))
    }

    /// Format for display (e.g., "9,50 €" or "$9.50").
    #[must_use]
    pub fn display(&self, currency: CurrencyCode) -> String {
        let fixed = format!("{:.2}", self.0.round_dp(2));
        match currency {
            CurrencyCode::EUR => format!("{} €", fixed.replace('.', ",")),
            CurrencyCode::GBP => format!("£{fixed}"),
            CurrencyCode::USD | CurrencyCode::CAD | CurrencyCode::AUD => format!("${fixed}"),
        }
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::new(amount)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Mul<u32> for Price {
    type Output = Self;

    fn mul(self, quantity: u32) -> Self::Output {
        Self(self.0.saturating_mul(Decimal::from(quantity)))
    }
}

impl std::iter::Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CurrencyCode {
    #[default]
    EUR,
    USD,
    GBP,
    CAD,
    AUD,
}

impl CurrencyCode {
    /// Number of decimal places in the minor unit.
    #[must_use]
    pub const fn minor_unit_exponent(self) -> u32 {
        2
    }

    /// Lowercase code as payment providers expect it ("eur").
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::EUR => "eur",
            Self::USD => "usd",
            Self::GBP => "gbp",
            Self::CAD => "cad",
            Self::AUD => "aud",
        }
    }
}

impl FromStr for CurrencyCode {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EUR" => Ok(Self::EUR),
            "USD" => Ok(Self::USD),
            "GBP" => Ok(Self::GBP),
            "CAD" => Ok(Self::CAD),
            "AUD" => Ok(Self::AUD),
            _ => Err(PriceError::UnknownCurrency(s.to_string())),
        }
    }
}
