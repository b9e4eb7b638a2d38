//! Shopify Storefront API client implementation.
//!
//! Uses `graphql_client` request/response envelopes with `reqwest` 0.13 for
//! HTTP. Cart methods return the raw [`CartNode`] selected by the
//! `CartFields` fragment.

pub mod queries;

use std::sync::Arc;

use graphql_client::{GraphQLQuery, Response};
use secrecy::{ExposeSecret, SecretString};
use shopcart_core::wire::UserErrorDto;
use tracing::{debug, instrument};

use crate::config::ShopifyStorefrontConfig;
use crate::shopify::{GraphQLError, GraphQLErrorLocation, ShopifyError};

use queries::{
    AddToCart, CartLineInput, CartLineUpdateInput, CartMutationPayload, CartNode, CreateCart,
    GetCart, RemoveFromCart, UpdateCartLines, add_to_cart, create_cart, get_cart,
    remove_from_cart, update_cart_lines,
};

/// Header carrying the server-side (private) Storefront token.
const PRIVATE_TOKEN_HEADER: &str = "Shopify-Storefront-Private-Token";

// =============================================================================
// StorefrontClient
// =============================================================================

/// Client for the Shopify Storefront Cart API.
#[derive(Clone)]
pub struct StorefrontClient {
    inner: Arc<StorefrontClientInner>,
}

struct StorefrontClientInner {
    client: reqwest::Client,
    endpoint: String,
    access_token: SecretString,
}

impl std::fmt::Debug for StorefrontClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontClient")
            .field("endpoint", &self.inner.endpoint)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

impl StorefrontClient {
    /// Create a new Storefront API client.
    #[must_use]
    pub fn new(config: &ShopifyStorefrontConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    /// Create a client with a preconfigured `reqwest` client.
    #[must_use]
    pub fn with_client(config: &ShopifyStorefrontConfig, client: reqwest::Client) -> Self {
        Self {
            inner: Arc::new(StorefrontClientInner {
                client,
                endpoint: config.endpoint(),
                access_token: config.storefront_private_token.clone(),
            }),
        }
    }

    /// GraphQL endpoint requests are sent to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.inner.endpoint
    }

    /// Execute a GraphQL operation.
    async fn execute<Q: GraphQLQuery>(
        &self,
        variables: Q::Variables,
    ) -> Result<Q::ResponseData, ShopifyError> {
        let request_body = Q::build_query(variables);
        debug!(operation = request_body.operation_name, "Sending Storefront request");

        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            .header(PRIVATE_TOKEN_HEADER, self.inner.access_token.expose_secret())
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ShopifyError::RateLimited(retry_after));
        }

        // Read as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %response_text.chars().take(500).collect::<String>(),
                "Shopify API returned non-success status"
            );
            return Err(ShopifyError::GraphQL(vec![GraphQLError::message(format!(
                "HTTP {status}: {}",
                response_text.chars().take(200).collect::<String>()
            ))]));
        }

        let response: Response<Q::ResponseData> = match serde_json::from_str(&response_text) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    body = %response_text.chars().take(500).collect::<String>(),
                    "Failed to parse Shopify GraphQL response"
                );
                return Err(ShopifyError::Parse(e));
            }
        };

        if let Some(errors) = response.errors
            && !errors.is_empty()
        {
            debug!(errors = ?errors, "GraphQL errors in response");
            return Err(ShopifyError::GraphQL(
                errors.into_iter().map(convert_graphql_error).collect(),
            ));
        }

        response.data.ok_or_else(|| {
            tracing::error!(
                body = %response_text.chars().take(500).collect::<String>(),
                "Shopify GraphQL response has no data and no errors"
            );
            ShopifyError::GraphQL(vec![GraphQLError::message("No data in response")])
        })
    }

    // =========================================================================
    // Cart Methods
    // =========================================================================

    /// Create a cart, optionally with a first line.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or Shopify rejects the input.
    #[instrument(skip(self))]
    pub async fn create_cart(&self, line: Option<(&str, i64)>) -> Result<CartNode, ShopifyError> {
        let variables = create_cart::Variables {
            input: create_cart::CartInput {
                lines: line
                    .map(|(merchandise_id, quantity)| CartLineInput {
                        merchandise_id: merchandise_id.to_string(),
                        quantity,
                    })
                    .into_iter()
                    .collect(),
            },
        };

        let data = self.execute::<CreateCart>(variables).await?;
        mutation_cart(data.cart_create, "cartCreate")
    }

    /// Get a cart by ID.
    ///
    /// # Errors
    ///
    /// Returns [`ShopifyError::NotFound`] if Shopify does not know the cart.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn get_cart(&self, cart_id: &str) -> Result<CartNode, ShopifyError> {
        let variables = get_cart::Variables {
            cart_id: cart_id.to_string(),
        };

        let data = self.execute::<GetCart>(variables).await?;

        data.cart
            .ok_or_else(|| ShopifyError::NotFound(format!("Cart not found: {cart_id}")))
    }

    /// Add a line to an existing cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or Shopify rejects the input.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn add_to_cart(
        &self,
        cart_id: &str,
        merchandise_id: &str,
        quantity: i64,
    ) -> Result<CartNode, ShopifyError> {
        let variables = add_to_cart::Variables {
            cart_id: cart_id.to_string(),
            lines: vec![CartLineInput {
                merchandise_id: merchandise_id.to_string(),
                quantity,
            }],
        };

        let data = self.execute::<AddToCart>(variables).await?;
        mutation_cart(data.cart_lines_add, "cartLinesAdd")
    }

    /// Set the quantity of a cart line.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or Shopify rejects the input.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn update_cart(
        &self,
        cart_id: &str,
        line_id: &str,
        quantity: i64,
    ) -> Result<CartNode, ShopifyError> {
        let variables = update_cart_lines::Variables {
            cart_id: cart_id.to_string(),
            lines: vec![CartLineUpdateInput {
                id: line_id.to_string(),
                quantity,
            }],
        };

        let data = self.execute::<UpdateCartLines>(variables).await?;
        mutation_cart(data.cart_lines_update, "cartLinesUpdate")
    }

    /// Remove a line from a cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or Shopify rejects the input.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn remove_from_cart(
        &self,
        cart_id: &str,
        line_id: &str,
    ) -> Result<CartNode, ShopifyError> {
        let variables = remove_from_cart::Variables {
            cart_id: cart_id.to_string(),
            line_ids: vec![line_id.to_string()],
        };

        let data = self.execute::<RemoveFromCart>(variables).await?;
        mutation_cart(data.cart_lines_remove, "cartLinesRemove")
    }
}

/// Unwrap a mutation payload: user errors win, then a missing cart.
fn mutation_cart(
    payload: Option<CartMutationPayload>,
    mutation: &str,
) -> Result<CartNode, ShopifyError> {
    let Some(payload) = payload else {
        return Err(ShopifyError::GraphQL(vec![GraphQLError::message(format!(
            "Unexpected Shopify response: {mutation} payload missing"
        ))]));
    };

    if !payload.user_errors.is_empty() {
        return Err(ShopifyError::UserError(payload.user_errors));
    }

    payload
        .cart
        .ok_or_else(|| ShopifyError::NotFound(format!("{mutation} returned no cart")))
}

fn convert_graphql_error(e: graphql_client::Error) -> GraphQLError {
    let code = e
        .extensions
        .as_ref()
        .and_then(|ext| ext.get("code"))
        .and_then(serde_json::Value::as_str)
        .map(str::to_string);

    GraphQLError {
        message: e.message,
        locations: e.locations.map_or_else(Vec::new, |locs| {
            locs.into_iter()
                .map(|l| GraphQLErrorLocation {
                    line: i64::from(l.line),
                    column: i64::from(l.column),
                })
                .collect()
        }),
        path: e.path.map_or_else(Vec::new, |p| {
            p.into_iter()
                .map(|fragment| match fragment {
                    graphql_client::PathFragment::Key(s) => serde_json::Value::String(s),
                    graphql_client::PathFragment::Index(i) => serde_json::Value::Number(i.into()),
                })
                .collect()
        }),
        code,
    }
}

/// Collapse user errors into a single line for logs.
#[must_use]
pub fn user_error_summary(errors: &[UserErrorDto]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn payload(value: serde_json::Value) -> Option<CartMutationPayload> {
        Some(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn test_mutation_cart_user_errors_win() {
        let result = mutation_cart(
            payload(json!({
                "cart": null,
                "userErrors": [{ "message": "The specified cart does not exist.", "field": ["cartId"] }]
            })),
            "cartLinesAdd",
        );
        let err = result.unwrap_err();
        assert!(err.is_missing_cart());
        assert!(matches!(err, ShopifyError::UserError(ref errors) if errors.len() == 1));
    }

    #[test]
    fn test_mutation_cart_null_cart_is_not_found() {
        let err = mutation_cart(payload(json!({ "cart": null, "userErrors": [] })), "cartLinesUpdate")
            .unwrap_err();
        assert!(matches!(err, ShopifyError::NotFound(_)));
    }

    #[test]
    fn test_mutation_cart_missing_payload() {
        let err = mutation_cart(None, "cartCreate").unwrap_err();
        assert!(matches!(err, ShopifyError::GraphQL(_)));
        assert!(!err.is_missing_cart());
    }

    #[test]
    fn test_convert_graphql_error_reads_extension_code() {
        let raw: graphql_client::Error = serde_json::from_value(json!({
            "message": "Throttled",
            "extensions": { "code": "THROTTLED" }
        }))
        .unwrap();
        let converted = convert_graphql_error(raw);
        assert!(converted.is_throttled());
        assert!(converted.locations.is_empty());
    }

    #[test]
    fn test_user_error_summary() {
        let errors = vec![
            UserErrorDto {
                message: "a".to_string(),
                field: None,
                code: None,
            },
            UserErrorDto {
                message: "b".to_string(),
                field: None,
                code: None,
            },
        ];
        assert_eq!(user_error_summary(&errors), "a; b");
    }
}
