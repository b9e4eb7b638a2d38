//! HTTP route handlers for the checkout proxy.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                        - Liveness check
//!
//! # Checkout API (JSON, POST only)
//! POST /api/checkout/create           - Create a cart
//! POST /api/checkout/add              - Add a line (creates the cart if needed)
//! POST /api/checkout/get              - Fetch a cart
//! POST /api/checkout/update-quantity  - Set a line's quantity
//! POST /api/checkout/remove-line      - Remove a line
//! ```

pub mod checkout;

use axum::{Router, routing::post};
use shopcart_core::wire::paths;

use crate::state::AppState;

/// Create the checkout API router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route(paths::CREATE, post(checkout::create))
        .route(paths::ADD, post(checkout::add))
        .route(paths::GET, post(checkout::get))
        .route(paths::UPDATE_QUANTITY, post(checkout::update_quantity))
        .route(paths::REMOVE_LINE, post(checkout::remove_line))
}
