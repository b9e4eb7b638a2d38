//! Checkout proxy handlers.
//!
//! Each handler validates its JSON body, runs one Storefront API call, and
//! answers with the cart in the `{"checkout": {...}}` envelope. Failures
//! follow the status convention in [`crate::error`].

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use shopcart_core::wire::{
    AddLineRequest, CheckoutDto, CheckoutEnvelope, CreateCartRequest, GetCartRequest,
    RemoveLineRequest, UpdateQuantityRequest,
};
use shopcart_core::{Cart, Quantity};
use tracing::{info, instrument, warn};

use crate::error::{ApiError, CartScope, Result};
use crate::shopify::queries::CartNode;
use crate::state::AppState;

const ADD_FAILED: &str = "Unable to add item to cart";
const CREATE_FAILED: &str = "Unable to create cart";
const GET_FAILED: &str = "Unable to load cart";
const UPDATE_FAILED: &str = "Failed to update quantity";
const REMOVE_FAILED: &str = "Failed to remove item";

const OUT_OF_STOCK_MESSAGE: &str =
    "Product unavailable - likely out of stock. Check Shopify product inventory settings.";
const OUT_OF_STOCK_DETAILS: &str =
    "Shopify returned quantity 0. Enable inventory or add stock in Shopify admin.";

// =============================================================================
// Request validation
// =============================================================================

fn body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::InvalidInput(rejection.body_text()))
}

fn required(value: Option<String>, message: &str) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::InvalidInput(message.to_string()))
}

/// Quantity for a new line; defaults to 1.
fn line_quantity(quantity: Option<i64>) -> Result<i64> {
    let quantity = quantity.unwrap_or(1);
    Quantity::from_i64(quantity)
        .map(i64::from)
        .map_err(|e| ApiError::InvalidInput(format!("quantity: {e}")))
}

// =============================================================================
// Response shaping
// =============================================================================

/// Reject carts where Shopify could not allocate a line.
fn ensure_allocated(node: &CartNode) -> Result<()> {
    if node.has_unallocated_line() {
        warn!(cart_id = %node.id, "Shopify returned a line with quantity 0");
        return Err(ApiError::OutOfStock {
            message: OUT_OF_STOCK_MESSAGE.to_string(),
            details: OUT_OF_STOCK_DETAILS.to_string(),
        });
    }
    Ok(())
}

/// Validate the Shopify cart and wrap it in the checkout envelope.
fn checkout(node: CartNode, context: &'static str) -> Result<Json<CheckoutEnvelope>> {
    let cart = Cart::try_from(CheckoutDto::from(node))
        .map_err(|source| ApiError::InvalidCart { context, source })?;
    Ok(Json(CheckoutEnvelope::from(&cart)))
}

// =============================================================================
// Handlers
// =============================================================================

/// `POST /api/checkout/create` - create a cart, optionally with one line.
#[instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreateCartRequest>, JsonRejection>,
) -> Result<Json<CheckoutEnvelope>> {
    let request = body(payload)?;

    let variant_id = request
        .variant_id
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let line = match variant_id {
        Some(variant_id) => Some((variant_id, line_quantity(request.quantity)?)),
        None => None,
    };

    let node = state
        .storefront()
        .create_cart(line.as_ref().map(|(v, q)| (v.as_str(), *q)))
        .await
        .map_err(|e| ApiError::from_shopify(CREATE_FAILED, CartScope::New, e))?;

    ensure_allocated(&node)?;
    info!(cart_id = %node.id, "Created cart");
    checkout(node, CREATE_FAILED)
}

/// `POST /api/checkout/add` - add a line, creating the cart when
/// `checkoutId` is absent.
#[instrument(skip_all)]
pub async fn add(
    State(state): State<AppState>,
    payload: std::result::Result<Json<AddLineRequest>, JsonRejection>,
) -> Result<Json<CheckoutEnvelope>> {
    let request = body(payload)?;
    let variant_id = required(request.variant_id, "variantId is required")?;
    let quantity = line_quantity(request.quantity)?;
    let cart_id = request
        .checkout_id
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    let node = match cart_id {
        Some(cart_id) => state
            .storefront()
            .add_to_cart(&cart_id, &variant_id, quantity)
            .await
            .map_err(|e| ApiError::from_shopify(ADD_FAILED, CartScope::Existing, e))?,
        None => state
            .storefront()
            .create_cart(Some((&variant_id, quantity)))
            .await
            .map_err(|e| ApiError::from_shopify(ADD_FAILED, CartScope::New, e))?,
    };

    ensure_allocated(&node)?;
    checkout(node, ADD_FAILED)
}

/// `POST /api/checkout/get` - fetch a cart.
#[instrument(skip_all)]
pub async fn get(
    State(state): State<AppState>,
    payload: std::result::Result<Json<GetCartRequest>, JsonRejection>,
) -> Result<Json<CheckoutEnvelope>> {
    let request = body(payload)?;
    let cart_id = required(request.checkout_id, "checkoutId is required")?;

    let node = state
        .storefront()
        .get_cart(&cart_id)
        .await
        .map_err(|e| ApiError::from_shopify(GET_FAILED, CartScope::Lookup, e))?;

    checkout(node, GET_FAILED)
}

/// `POST /api/checkout/update-quantity` - set a line's quantity (>= 1).
#[instrument(skip_all)]
pub async fn update_quantity(
    State(state): State<AppState>,
    payload: std::result::Result<Json<UpdateQuantityRequest>, JsonRejection>,
) -> Result<Json<CheckoutEnvelope>> {
    const MISSING: &str = "Missing required fields: cartId, lineId, quantity (must be >= 1)";

    let request = body(payload)?;
    let cart_id = required(request.cart_id, MISSING)?;
    let line_id = required(request.line_id, MISSING)?;
    let quantity = request
        .quantity
        .filter(|q| *q >= 1)
        .ok_or_else(|| ApiError::InvalidInput(MISSING.to_string()))?;
    let quantity = line_quantity(Some(quantity))?;

    let node = state
        .storefront()
        .update_cart(&cart_id, &line_id, quantity)
        .await
        .map_err(|e| ApiError::from_shopify(UPDATE_FAILED, CartScope::Existing, e))?;

    checkout(node, UPDATE_FAILED)
}

/// `POST /api/checkout/remove-line` - remove a line.
#[instrument(skip_all)]
pub async fn remove_line(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RemoveLineRequest>, JsonRejection>,
) -> Result<Json<CheckoutEnvelope>> {
    const MISSING: &str = "Missing required fields: cartId, lineId";

    let request = body(payload)?;
    let cart_id = required(request.cart_id, MISSING)?;
    let line_id = required(request.line_id, MISSING)?;

    let node = state
        .storefront()
        .remove_from_cart(&cart_id, &line_id)
        .await
        .map_err(|e| ApiError::from_shopify(REMOVE_FAILED, CartScope::Existing, e))?;

    checkout(node, REMOVE_FAILED)
}
