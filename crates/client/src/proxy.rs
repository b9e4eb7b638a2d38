//! HTTP client for the checkout proxy.
//!
//! Implements [`CartBackend`] over the proxy's JSON endpoints and maps its
//! status convention onto [`CartError`]:
//!
//! | Response | Error |
//! |---|---|
//! | `410`, or `clearCart: true`, or `CART_EXPIRED` | [`CartError::CartExpired`] |
//! | `429` or `THROTTLED` | [`CartError::RateLimited`] |
//! | `404` or `NOT_FOUND` | [`CartError::NotFound`] |
//! | `OUT_OF_STOCK` | [`CartError::OutOfStock`] |
//! | other `400` | [`CartError::Validation`] |
//! | anything else, transport failures | [`CartError::Remote`] |

use std::sync::Arc;

use reqwest::StatusCode;
use serde::Serialize;
use shopcart_core::wire::{
    AddLineRequest, CheckoutEnvelope, CreateCartRequest, ErrorBody, ErrorCode, GetCartRequest,
    RemoveLineRequest, UpdateQuantityRequest, paths,
};
use shopcart_core::{Cart, CartId, CartLineId, Quantity, VariantId};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::backend::CartBackend;
use crate::error::CartError;

/// Errors constructing a [`ProxyClient`].
#[derive(Debug, thiserror::Error)]
pub enum ProxyClientError {
    #[error("invalid proxy URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("proxy URL must be http or https, got {0}")]
    UnsupportedScheme(String),
}

/// Client for the checkout proxy endpoints.
#[derive(Clone)]
pub struct ProxyClient {
    inner: Arc<ProxyClientInner>,
}

struct ProxyClientInner {
    client: reqwest::Client,
    base_url: String,
}

impl std::fmt::Debug for ProxyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyClient")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

impl ProxyClient {
    /// Create a client for the proxy at `base_url` (e.g. `http://127.0.0.1:3000`).
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not an http(s) URL.
    pub fn new(base_url: &str) -> Result<Self, ProxyClientError> {
        Self::with_client(base_url, reqwest::Client::new())
    }

    /// Like [`Self::new`], with a preconfigured `reqwest` client (timeouts,
    /// cookie store, ...).
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not an http(s) URL.
    pub fn with_client(base_url: &str, client: reqwest::Client) -> Result<Self, ProxyClientError> {
        let url = Url::parse(base_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ProxyClientError::UnsupportedScheme(url.scheme().to_string()));
        }

        Ok(Self {
            inner: Arc::new(ProxyClientInner {
                client,
                base_url: base_url.trim_end_matches('/').to_string(),
            }),
        })
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// POST a JSON body and decode the checkout envelope.
    async fn post<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<Cart, CartError> {
        let url = format!("{}{path}", self.inner.base_url);

        let response = self
            .inner
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, url = %url, "Cart proxy request failed");
                CartError::remote("Network error", Some(e.to_string()))
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            CartError::Remote {
                message: "Failed to read cart response".to_string(),
                details: Some(e.to_string()),
                status: Some(status.as_u16()),
            }
        })?;

        if !status.is_success() {
            let body = serde_json::from_str::<ErrorBody>(&text).ok();
            let error = classify(status, body);
            debug!(status = %status, error = %error, "Cart proxy returned an error");
            return Err(error);
        }

        let envelope: CheckoutEnvelope = serde_json::from_str(&text).map_err(|e| {
            warn!(
                error = %e,
                body = %text.chars().take(500).collect::<String>(),
                "Failed to parse cart proxy response"
            );
            CartError::remote("Unexpected response from cart service", Some(e.to_string()))
        })?;

        Cart::try_from(envelope.checkout).map_err(|e| {
            warn!(error = %e, "Cart proxy returned an invalid cart");
            CartError::remote("Unexpected response from cart service", Some(e.to_string()))
        })
    }
}

/// Map a non-success proxy response onto the error taxonomy.
#[must_use]
pub fn classify(status: StatusCode, body: Option<ErrorBody>) -> CartError {
    let code = body.as_ref().and_then(|b| b.code);
    let clear_cart = body.as_ref().is_some_and(|b| b.clear_cart);

    if status == StatusCode::GONE || clear_cart || code == Some(ErrorCode::CartExpired) {
        return CartError::CartExpired;
    }
    if status == StatusCode::TOO_MANY_REQUESTS || code == Some(ErrorCode::Throttled) {
        return CartError::RateLimited;
    }
    if status == StatusCode::NOT_FOUND || code == Some(ErrorCode::NotFound) {
        return CartError::NotFound;
    }

    let (message, details) = body.map_or_else(
        || (String::new(), None),
        |b| (b.error.text(), b.details),
    );

    if code == Some(ErrorCode::OutOfStock) {
        return CartError::OutOfStock { message, details };
    }

    if status == StatusCode::BAD_REQUEST {
        let message = match details {
            Some(details) if !details.is_empty() => format!("{message}\n{details}"),
            _ => message,
        };
        return CartError::Validation(message);
    }

    CartError::Remote {
        message: if message.is_empty() {
            format!("HTTP {status}")
        } else {
            message
        },
        details,
        status: Some(status.as_u16()),
    }
}

impl CartBackend for ProxyClient {
    #[instrument(skip(self), fields(variant_id = %variant_id))]
    async fn create_cart(&self, variant_id: &VariantId, quantity: Quantity) -> Result<Cart, CartError> {
        let body = CreateCartRequest {
            variant_id: Some(variant_id.to_string()),
            quantity: Some(i64::from(quantity)),
        };
        self.post(paths::CREATE, &body).await
    }

    #[instrument(skip(self), fields(cart_id = %cart_id, variant_id = %variant_id))]
    async fn add_line(
        &self,
        cart_id: &CartId,
        variant_id: &VariantId,
        quantity: Quantity,
    ) -> Result<Cart, CartError> {
        let body = AddLineRequest {
            checkout_id: Some(cart_id.to_string()),
            variant_id: Some(variant_id.to_string()),
            quantity: Some(i64::from(quantity)),
        };
        self.post(paths::ADD, &body).await
    }

    #[instrument(skip(self), fields(cart_id = %cart_id, line_id = %line_id))]
    async fn update_line_quantity(
        &self,
        cart_id: &CartId,
        line_id: &CartLineId,
        quantity: Quantity,
    ) -> Result<Cart, CartError> {
        let body = UpdateQuantityRequest {
            cart_id: Some(cart_id.to_string()),
            line_id: Some(line_id.to_string()),
            quantity: Some(i64::from(quantity)),
        };
        self.post(paths::UPDATE_QUANTITY, &body).await
    }

    #[instrument(skip(self), fields(cart_id = %cart_id, line_id = %line_id))]
    async fn remove_line(&self, cart_id: &CartId, line_id: &CartLineId) -> Result<Cart, CartError> {
        let body = RemoveLineRequest {
            cart_id: Some(cart_id.to_string()),
            line_id: Some(line_id.to_string()),
        };
        self.post(paths::REMOVE_LINE, &body).await
    }

    #[instrument(skip(self), fields(cart_id = %cart_id))]
    async fn fetch_cart(&self, cart_id: &CartId) -> Result<Cart, CartError> {
        let body = GetCartRequest {
            checkout_id: Some(cart_id.to_string()),
        };
        self.post(paths::GET, &body).await
    }
}
