//! The remote side of the cart.
//!
//! [`CartBackend`] is the seam between the state manager and whatever owns
//! the cart. In production that is [`crate::ProxyClient`] talking to the
//! checkout proxy; tests substitute scripted fakes.

use std::future::Future;

use shopcart_core::{Cart, CartId, CartLineId, Quantity, VariantId};

use crate::error::CartError;

/// Cart operations offered by the remote commerce backend.
///
/// Every successful call returns the complete, fresh cart snapshot.
pub trait CartBackend: Send + Sync {
    /// Create a cart holding a single line.
    fn create_cart(
        &self,
        variant_id: &VariantId,
        quantity: Quantity,
    ) -> impl Future<Output = Result<Cart, CartError>> + Send;

    /// Add a line to an existing cart.
    ///
    /// Fails with [`CartError::CartExpired`] when the cart is no longer valid.
    fn add_line(
        &self,
        cart_id: &CartId,
        variant_id: &VariantId,
        quantity: Quantity,
    ) -> impl Future<Output = Result<Cart, CartError>> + Send;

    /// Set a line's quantity.
    fn update_line_quantity(
        &self,
        cart_id: &CartId,
        line_id: &CartLineId,
        quantity: Quantity,
    ) -> impl Future<Output = Result<Cart, CartError>> + Send;

    /// Remove a line.
    fn remove_line(
        &self,
        cart_id: &CartId,
        line_id: &CartLineId,
    ) -> impl Future<Output = Result<Cart, CartError>> + Send;

    /// Fetch a cart by ID; [`CartError::NotFound`] when it does not exist.
    fn fetch_cart(&self, cart_id: &CartId) -> impl Future<Output = Result<Cart, CartError>> + Send;
}
