//! Observable cart state and shopper notifications.

use serde::Serialize;
use shopcart_core::Cart;

use crate::error::ErrorInfo;

/// Snapshot of everything the view layer renders.
///
/// Published through a `tokio::sync::watch` channel by
/// [`crate::CartManager`]; consumers read it reactively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartState {
    /// Current cart, `None` until the first successful add.
    pub cart: Option<Cart>,
    /// An operation is in flight; controls should be disabled.
    pub is_busy: bool,
    /// The last error shown to the shopper.
    pub last_error: Option<ErrorInfo>,
    /// Whether the cart drawer is open.
    pub is_drawer_open: bool,
}

impl CartState {
    /// Total number of items across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.cart.as_ref().map_or(0, Cart::total_quantity)
    }

    /// Cart total formatted with its currency code, e.g. `"24.00 USD"`.
    #[must_use]
    pub fn total_cost(&self) -> Option<String> {
        self.cart.as_ref().map(|cart| cart.cost.total.to_string())
    }

    /// Cart subtotal formatted with its currency code.
    #[must_use]
    pub fn subtotal(&self) -> Option<String> {
        self.cart.as_ref().map(|cart| cart.cost.subtotal.to_string())
    }

    /// No cart, or a cart without lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cart.as_ref().is_none_or(Cart::is_empty)
    }

    /// Where to send the shopper to pay.
    #[must_use]
    pub fn checkout_url(&self) -> Option<&str> {
        self.cart.as_ref().map(|cart| cart.checkout_url.as_str())
    }
}

/// Severity of a [`Notification`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Success,
    Error,
}

/// A transient, toast-style message for the shopper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Severity.
    pub level: NotificationLevel,
    /// Text to show.
    pub message: String,
}

impl Notification {
    /// Success toast.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    /// Error toast.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use shopcart_core::{CartCost, CartId, Money};

    use super::*;

    #[test]
    fn test_default_state_is_empty() {
        let state = CartState::default();
        assert!(state.is_empty());
        assert_eq!(state.item_count(), 0);
        assert_eq!(state.total_cost(), None);
        assert!(!state.is_busy);
    }

    #[test]
    fn test_cart_without_lines_is_empty() {
        let state = CartState {
            cart: Some(Cart {
                id: CartId::new("c"),
                checkout_url: "https://shop.example/c".to_string(),
                cost: CartCost {
                    subtotal: Money::zero("USD"),
                    total: Money::parse("0", "USD").unwrap(),
                },
                lines: vec![],
            }),
            ..CartState::default()
        };
        assert!(state.is_empty());
        assert_eq!(state.total_cost().as_deref(), Some("0.00 USD"));
        assert_eq!(state.checkout_url(), Some("https://shop.example/c"));
    }
}
