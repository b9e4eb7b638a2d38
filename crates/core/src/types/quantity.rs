//! Line item quantity.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityError {
    /// Quantities start at 1; removing a line is a separate operation.
    #[error("quantity must be at least 1")]
    Zero,
    /// Negative or out-of-range value from an untyped source.
    #[error("quantity out of range: {0}")]
    OutOfRange(i64),
}

/// A cart line quantity, always `>= 1`.
///
/// There is no way to build a `Quantity` of zero, so a request for a
/// zero-quantity line cannot be expressed. [`Quantity::decrement`] stops at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    /// A single unit.
    pub const ONE: Self = Self(1);

    /// Create a quantity.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::Zero`] for 0.
    pub const fn new(value: u32) -> Result<Self, QuantityError> {
        if value == 0 {
            Err(QuantityError::Zero)
        } else {
            Ok(Self(value))
        }
    }

    /// Create a quantity from a signed value (GraphQL `Int`).
    ///
    /// # Errors
    ///
    /// Returns an error for 0, negatives, and values above `u32::MAX`.
    pub fn from_i64(value: i64) -> Result<Self, QuantityError> {
        match u32::try_from(value) {
            Ok(v) => Self::new(v),
            Err(_) => Err(QuantityError::OutOfRange(value)),
        }
    }

    /// The underlying count.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// One more, saturating at `u32::MAX`.
    #[must_use]
    pub const fn increment(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// One less, clamped at 1.
    #[must_use]
    pub const fn decrement(self) -> Self {
        if self.0 > 1 { Self(self.0 - 1) } else { Self(1) }
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u32> for Quantity {
    type Error = QuantityError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for u32 {
    fn from(q: Quantity) -> Self {
        q.0
    }
}

impl From<Quantity> for i64 {
    fn from(q: Quantity) -> Self {
        Self::from(q.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_rejected() {
        assert_eq!(Quantity::new(0), Err(QuantityError::Zero));
        assert_eq!(Quantity::from_i64(0), Err(QuantityError::Zero));
        assert_eq!(Quantity::from_i64(-3), Err(QuantityError::OutOfRange(-3)));
    }

    #[test]
    fn test_decrement_clamps_at_one() {
        assert_eq!(Quantity::ONE.decrement(), Quantity::ONE);
        assert_eq!(Quantity::new(3).unwrap().decrement().get(), 2);
    }

    #[test]
    fn test_increment_saturates() {
        assert_eq!(Quantity::new(u32::MAX).unwrap().increment().get(), u32::MAX);
        assert_eq!(Quantity::ONE.increment().get(), 2);
    }

    #[test]
    fn test_deserialize_rejects_zero() {
        assert!(serde_json::from_str::<Quantity>("0").is_err());
        assert_eq!(serde_json::from_str::<Quantity>("4").unwrap().get(), 4);
    }

    #[test]
    fn test_default_is_one() {
        assert_eq!(Quantity::default(), Quantity::ONE);
    }
}
