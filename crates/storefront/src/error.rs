//! Unified error handling with Sentry integration.
//!
//! Every checkout handler returns `Result<T, ApiError>`. The error renders as
//! an [`ErrorBody`] JSON document whose HTTP status and `code` tell the cart
//! client how to recover. Upstream failures are captured to Sentry before
//! responding.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use shopcart_core::CartDataError;
use shopcart_core::wire::{ErrorBody, ErrorCode, ErrorMessage, UserErrorDto};
use thiserror::Error;

use crate::shopify::ShopifyError;

pub const CART_EXPIRED_MESSAGE: &str = "Cart expired. Please try again.";
pub const THROTTLED_MESSAGE: &str = "Too many requests. Please wait a moment and try again.";

/// How the cart a Shopify call targeted relates to the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartScope {
    /// The call creates a cart.
    New,
    /// The call mutates a cart the client holds.
    Existing,
    /// The call reads a cart.
    Lookup,
}

/// Checkout API error.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed request fields.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Shopify rejected the mutation input.
    #[error("Rejected by Shopify: {}", summarize(.0))]
    UserErrors(Vec<UserErrorDto>),

    /// Shopify created the line but could not allocate any stock.
    #[error("Out of stock: {message}")]
    OutOfStock { message: String, details: String },

    /// The cart does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The cart a mutation targeted is gone; the client should drop it.
    #[error("Cart expired")]
    CartExpired,

    /// Shopify is throttling us.
    #[error("Throttled by Shopify")]
    Throttled,

    /// Any other Shopify failure.
    #[error("{context}: {source}")]
    Shopify {
        context: &'static str,
        #[source]
        source: ShopifyError,
    },

    /// Shopify answered with a cart we could not make sense of.
    #[error("{context}: {source}")]
    InvalidCart {
        context: &'static str,
        #[source]
        source: CartDataError,
    },
}

impl ApiError {
    /// Classify a Shopify failure for a call against a cart in `scope`.
    #[must_use]
    pub fn from_shopify(context: &'static str, scope: CartScope, err: ShopifyError) -> Self {
        if err.is_throttled() {
            return Self::Throttled;
        }

        match (scope, err) {
            (CartScope::Existing, err) if err.is_missing_cart() => Self::CartExpired,
            (CartScope::Lookup, ShopifyError::NotFound(message)) => Self::NotFound(message),
            (_, ShopifyError::UserError(errors)) => Self::UserErrors(errors),
            (_, source) => Self::Shopify { context, source },
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) | Self::UserErrors(_) | Self::OutOfStock { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::CartExpired => StatusCode::GONE,
            Self::Throttled => StatusCode::TOO_MANY_REQUESTS,
            Self::Shopify { .. } | Self::InvalidCart { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// JSON body for this error.
    #[must_use]
    pub fn body(&self) -> ErrorBody {
        match self {
            Self::InvalidInput(message) => ErrorBody::new(message.clone(), ErrorCode::InvalidInput),
            Self::UserErrors(errors) => ErrorBody {
                error: ErrorMessage::UserErrors(errors.clone()),
                code: Some(ErrorCode::InvalidInput),
                details: None,
                clear_cart: false,
            },
            Self::OutOfStock { message, details } => {
                ErrorBody::new(message.clone(), ErrorCode::OutOfStock).with_details(details.clone())
            }
            Self::NotFound(_) => ErrorBody::new("cart not found", ErrorCode::NotFound),
            Self::CartExpired => ErrorBody::new(CART_EXPIRED_MESSAGE, ErrorCode::CartExpired),
            Self::Throttled => ErrorBody::new(THROTTLED_MESSAGE, ErrorCode::Throttled),
            Self::Shopify { context, source } => {
                ErrorBody::new(*context, ErrorCode::UpstreamError).with_details(source.to_string())
            }
            Self::InvalidCart { context, source } => {
                ErrorBody::new(*context, ErrorCode::UpstreamError)
                    .with_details(format!("Unexpected Shopify response: {source}"))
            }
        }
    }
}

fn summarize(errors: &[UserErrorDto]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Checkout request failed"
            );
        } else {
            tracing::warn!(error = %self, status = %status, "Checkout request rejected");
        }

        (status, Json(self.body())).into_response()
    }
}

/// Result type alias for `ApiError`.
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::shopify::GraphQLError;

    async fn render(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn cart_id_error() -> ShopifyError {
        ShopifyError::UserError(vec![UserErrorDto {
            message: "The specified cart does not exist.".to_string(),
            field: Some(vec!["cartId".to_string()]),
            code: Some("INVALID".to_string()),
        }])
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::InvalidInput("x".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::CartExpired.status(), StatusCode::GONE);
        assert_eq!(ApiError::Throttled.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            ApiError::NotFound("c".to_string()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Shopify {
                context: "Failed",
                source: ShopifyError::GraphQL(vec![]),
            }
            .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_from_shopify_throttled_wins() {
        let mut throttled = GraphQLError::message("Throttled");
        throttled.code = Some("THROTTLED".to_string());
        let err = ApiError::from_shopify(
            "Unable to add item to cart",
            CartScope::Existing,
            ShopifyError::GraphQL(vec![throttled]),
        );
        assert!(matches!(err, ApiError::Throttled));
    }

    #[test]
    fn test_from_shopify_missing_cart_depends_on_scope() {
        assert!(matches!(
            ApiError::from_shopify("x", CartScope::Existing, cart_id_error()),
            ApiError::CartExpired
        ));
        assert!(matches!(
            ApiError::from_shopify("x", CartScope::New, cart_id_error()),
            ApiError::UserErrors(_)
        ));
        assert!(matches!(
            ApiError::from_shopify("x", CartScope::Lookup, ShopifyError::NotFound("c".to_string())),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from_shopify("x", CartScope::Existing, ShopifyError::NotFound("c".to_string())),
            ApiError::CartExpired
        ));
    }

    #[tokio::test]
    async fn test_cart_expired_body() {
        let (status, body) = render(ApiError::CartExpired).await;
        assert_eq!(status, StatusCode::GONE);
        assert_eq!(body["code"], "CART_EXPIRED");
        assert_eq!(body["clearCart"], true);
        assert_eq!(body["error"], CART_EXPIRED_MESSAGE);
    }

    #[tokio::test]
    async fn test_user_errors_body_is_array() {
        let (status, body) = render(ApiError::UserErrors(vec![UserErrorDto {
            message: "Merchandise does not exist".to_string(),
            field: Some(vec!["lines".to_string()]),
            code: None,
        }]))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"][0]["message"], "Merchandise does not exist");
        assert_eq!(body["code"], "INVALID_INPUT");
        assert!(body.get("clearCart").is_none());
    }

    #[tokio::test]
    async fn test_upstream_body_has_details() {
        let (status, body) = render(ApiError::Shopify {
            context: "Failed to update quantity",
            source: ShopifyError::GraphQL(vec![GraphQLError::message("boom")]),
        })
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to update quantity");
        assert_eq!(body["code"], "UPSTREAM_ERROR");
        assert_eq!(body["details"], "GraphQL errors: boom");
    }
}
