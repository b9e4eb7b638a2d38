//! Type-safe monetary amounts using decimal arithmetic.
//!
//! Shopify sends amounts as decimal strings (`"19.99"`) next to an ISO 4217
//! currency code. Amounts are kept as [`Decimal`] so that formatting and the
//! occasional fallback multiplication never go through floating point.

use core::fmt;
use core::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::Quantity;

/// Errors that can occur when parsing a [`Money`] value.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// The amount is not a decimal number.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    /// The currency code is empty.
    #[error("currency code cannot be empty")]
    MissingCurrency,
}

/// Monetary amount with currency code.
///
/// Serializes in the Storefront API shape: `{"amount": "19.99", "currencyCode": "USD"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: String,
}

impl Money {
    /// Create a new amount.
    #[must_use]
    pub fn new(amount: Decimal, currency_code: impl Into<String>) -> Self {
        Self {
            amount,
            currency_code: currency_code.into(),
        }
    }

    /// Parse an amount from its decimal-string form.
    ///
    /// # Errors
    ///
    /// Returns an error if `amount` is not a decimal or `currency_code` is blank.
    pub fn parse(amount: &str, currency_code: &str) -> Result<Self, MoneyError> {
        let currency_code = currency_code.trim();
        if currency_code.is_empty() {
            return Err(MoneyError::MissingCurrency);
        }
        let amount = Decimal::from_str(amount.trim())
            .map_err(|_| MoneyError::InvalidAmount(amount.to_string()))?;
        Ok(Self::new(amount, currency_code))
    }

    /// A zero amount in the given currency.
    #[must_use]
    pub fn zero(currency_code: impl Into<String>) -> Self {
        Self::new(Decimal::ZERO, currency_code)
    }

    /// Multiply a unit price by a quantity, rounded to 2 decimal places.
    ///
    /// Returns `None` when the product overflows `Decimal`.
    #[must_use]
    pub fn times(&self, quantity: Quantity) -> Option<Self> {
        let total = self.amount.checked_mul(Decimal::from(quantity.get()))?;
        Some(Self::new(round_cents(total), self.currency_code.clone()))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} {}", round_cents(self.amount), self.currency_code)
    }
}

/// Half-up rounding to cents, the way prices are shown to shoppers.
fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

impl FromStr for Money {
    type Err = MoneyError;

    /// Parse `"<amount> <CODE>"`, the same form `Display` writes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (amount, code) = s
            .trim()
            .split_once(' ')
            .ok_or(MoneyError::MissingCurrency)?;
        Self::parse(amount, code)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal_string() {
        let money = Money::parse("19.99", "USD").unwrap();
        assert_eq!(money.amount, Decimal::new(1999, 2));
        assert_eq!(money.currency_code, "USD");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            Money::parse("abc", "USD"),
            Err(MoneyError::InvalidAmount(_))
        ));
        assert_eq!(Money::parse("1.00", " "), Err(MoneyError::MissingCurrency));
    }

    #[test]
    fn test_display_pads_to_two_places() {
        assert_eq!(Money::parse("5", "EUR").unwrap().to_string(), "5.00 EUR");
        assert_eq!(Money::parse("12.5", "USD").unwrap().to_string(), "12.50 USD");
    }

    #[test]
    fn test_times_rounds_to_cents() {
        let unit = Money::parse("3.335", "USD").unwrap();
        let total = unit.times(Quantity::new(3).unwrap()).unwrap();
        assert_eq!(total.amount, Decimal::new(1001, 2));
    }

    #[test]
    fn test_times_overflow_is_none() {
        let unit = Money::new(Decimal::MAX, "USD");
        assert!(unit.times(Quantity::new(2).unwrap()).is_none());
        assert!(unit.times(Quantity::ONE).is_some());
    }

    #[test]
    fn test_wire_shape() {
        let money = Money::parse("10.00", "CAD").unwrap();
        let json = serde_json::to_value(&money).unwrap();
        assert_eq!(json["amount"], "10.00");
        assert_eq!(json["currencyCode"], "CAD");
    }

    #[test]
    fn test_from_str_roundtrips_display() {
        let money: Money = "42.10 GBP".parse().unwrap();
        assert_eq!(money.to_string(), "42.10 GBP");
    }
}
