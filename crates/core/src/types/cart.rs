//! The cart aggregate.
//!
//! A [`Cart`] is owned by Shopify; the local copy is a snapshot that is
//! replaced wholesale after every mutation. Values are only ever built from
//! [`crate::wire::CheckoutDto`] (see `TryFrom` in the wire module), which is
//! where malformed payloads are rejected.

use serde::{Deserialize, Serialize};

use super::{CartId, CartLineId, Money, MoneyError, Quantity, QuantityError, VariantId};

/// Errors raised while validating a cart payload.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartDataError {
    /// A required field is absent or blank.
    #[error("missing field: {0}")]
    MissingField(&'static str),
    /// A line carries a quantity outside `1..`.
    #[error("line {line}: {source}")]
    InvalidQuantity {
        /// Offending line ID.
        line: String,
        /// Underlying quantity error.
        source: QuantityError,
    },
    /// An amount failed to parse.
    #[error("{field}: {source}")]
    InvalidMoney {
        /// Which amount was bad.
        field: &'static str,
        /// Underlying money error.
        source: MoneyError,
    },
}

/// Product or variant image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    /// Image URL.
    pub url: String,
    /// Alt text.
    pub alt_text: Option<String>,
}

/// Parent product of a purchased variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchandiseProduct {
    /// Product title.
    pub title: String,
    /// Product handle (URL slug).
    pub handle: String,
}

/// Snapshot of the purchased variant, denormalized at fetch time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Merchandise {
    /// Variant ID.
    pub id: VariantId,
    /// Variant title ("Default Title" for single-variant products).
    pub title: String,
    /// Variant image.
    pub image: Option<Image>,
    /// Unit price.
    pub price: Money,
    /// Parent product.
    pub product: MerchandiseProduct,
}

impl Merchandise {
    /// Variant title to show next to the product, if it carries information.
    #[must_use]
    pub fn display_variant_title(&self) -> Option<&str> {
        if self.title.is_empty() || self.title == "Default Title" {
            None
        } else {
            Some(&self.title)
        }
    }
}

/// A line item in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Cart line ID.
    pub id: CartLineId,
    /// Quantity.
    pub quantity: Quantity,
    /// Product variant.
    pub merchandise: Merchandise,
    /// Line total as computed by Shopify.
    pub total_amount: Option<Money>,
}

impl CartLine {
    /// Line total; falls back to unit price times quantity when Shopify
    /// did not send one, and to the unit price if that overflows.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.total_amount
            .clone()
            .or_else(|| self.merchandise.price.times(self.quantity))
            .unwrap_or_else(|| self.merchandise.price.clone())
    }
}

/// Cart cost summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartCost {
    /// Subtotal before tax/shipping.
    pub subtotal: Money,
    /// Total amount.
    pub total: Money,
}

/// A shopping cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    /// Cart ID.
    pub id: CartId,
    /// Checkout URL.
    pub checkout_url: String,
    /// Cart cost summary.
    pub cost: CartCost,
    /// Cart lines, in the order Shopify returned them.
    pub lines: Vec<CartLine>,
}

impl Cart {
    /// Sum of all line quantities.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.lines
            .iter()
            .map(|line| u64::from(line.quantity.get()))
            .sum()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Find a line by ID.
    #[must_use]
    pub fn line(&self, id: &CartLineId) -> Option<&CartLine> {
        self.lines.iter().find(|line| &line.id == id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(id: &str, quantity: u32, total: Option<&str>) -> CartLine {
        CartLine {
            id: CartLineId::new(id),
            quantity: Quantity::new(quantity).unwrap(),
            merchandise: Merchandise {
                id: VariantId::new(format!("variant-{id}")),
                title: "Default Title".to_string(),
                image: None,
                price: Money::parse("4.50", "USD").unwrap(),
                product: MerchandiseProduct {
                    title: "Coconut Soap".to_string(),
                    handle: "coconut-soap".to_string(),
                },
            },
            total_amount: total.map(|t| Money::parse(t, "USD").unwrap()),
        }
    }

    fn cart(lines: Vec<CartLine>) -> Cart {
        Cart {
            id: CartId::new("gid://shopify/Cart/1"),
            checkout_url: "https://shop.example/checkout".to_string(),
            cost: CartCost {
                subtotal: Money::zero("USD"),
                total: Money::zero("USD"),
            },
            lines,
        }
    }

    #[test]
    fn test_total_quantity_sums_lines() {
        let cart = cart(vec![line("a", 2, None), line("b", 3, None)]);
        assert_eq!(cart.total_quantity(), 5);
        assert!(!cart.is_empty());
    }

    #[test]
    fn test_empty_cart() {
        let cart = cart(vec![]);
        assert_eq!(cart.total_quantity(), 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_line_total_prefers_remote_amount() {
        let l = line("a", 2, Some("8.00"));
        assert_eq!(l.line_total().to_string(), "8.00 USD");
    }

    #[test]
    fn test_line_total_fallback() {
        let l = line("a", 3, None);
        assert_eq!(l.line_total().to_string(), "13.50 USD");
    }

    #[test]
    fn test_lookup_by_line_id() {
        let cart = cart(vec![line("a", 1, None), line("b", 1, None)]);
        assert!(cart.line(&CartLineId::new("b")).is_some());
        assert!(cart.line(&CartLineId::new("c")).is_none());
    }

    #[test]
    fn test_line_total_overflow_falls_back_to_unit_price() {
        let mut l = line("a", 2, None);
        l.merchandise.price = Money::new(rust_decimal::Decimal::MAX, "USD");
        assert_eq!(l.line_total(), l.merchandise.price);
    }

    #[test]
    fn test_default_variant_title_hidden() {
        let l = line("a", 1, None);
        assert_eq!(l.merchandise.display_variant_title(), None);
    }
}
