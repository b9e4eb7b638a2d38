//! shopcart storefront - checkout proxy library.
//!
//! A thin server in front of the Shopify Storefront Cart API. It holds the
//! private Storefront token, so browsers and other clients never see it,
//! and translates Shopify's responses into the checkout envelope and status
//! convention the cart client understands.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod shopify;
pub mod state;

use std::time::Duration;

use axum::{Router, routing::get};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::rate_limit::RateLimiterLayer;
use crate::state::AppState;

/// Build the application router.
///
/// `rate_limiter` is applied to the checkout API only; `/health` is never
/// limited. Sentry layers are added by the binary.
pub fn router(state: AppState, rate_limiter: Option<RateLimiterLayer>) -> Router {
    let mut checkout = routes::checkout_routes();
    if let Some(limiter) = rate_limiter {
        checkout = checkout.layer(limiter);
    }

    Router::new()
        .route("/health", get(health))
        .merge(checkout)
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not call Shopify.
async fn health() -> &'static str {
    "ok"
}
