//! Shopify Storefront API client.
//!
//! # Architecture
//!
//! - `graphql_client` request/response envelopes, reqwest 0.13 for HTTP
//! - Shopify is the source of truth for carts; nothing is cached or stored
//! - Cart payloads are returned in their raw wire shape so the route layer
//!   can inspect them (e.g. zero-quantity lines) before validating
//!
//! # Example
//!
//! ```rust,ignore
//! use shopcart_storefront::shopify::StorefrontClient;
//!
//! let client = StorefrontClient::new(&config.shopify);
//! let cart = client.create_cart(Some(("gid://shopify/ProductVariant/1", 1))).await?;
//! let cart = client.add_to_cart(&cart.id, "gid://shopify/ProductVariant/2", 2).await?;
//! ```

mod storefront;

pub use storefront::StorefrontClient;
pub use storefront::queries;

use shopcart_core::wire::UserErrorDto;
use thiserror::Error;

/// GraphQL `extensions.code` Shopify sets when a request is throttled.
pub const THROTTLED_CODE: &str = "THROTTLED";

/// Errors that can occur when interacting with the Storefront API.
#[derive(Debug, Error)]
pub enum ShopifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by Shopify (HTTP 429).
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// A mutation returned `userErrors`.
    #[error("User error: {}", format_user_errors(.0))]
    UserError(Vec<UserErrorDto>),
}

impl ShopifyError {
    /// Shopify asked us to slow down, either with HTTP 429 or a GraphQL
    /// error carrying `extensions.code = THROTTLED`.
    #[must_use]
    pub fn is_throttled(&self) -> bool {
        match self {
            Self::RateLimited(_) => true,
            Self::GraphQL(errors) => errors.iter().any(GraphQLError::is_throttled),
            _ => false,
        }
    }

    /// The cart a mutation targeted is gone: not found, or a user error
    /// pointing at the `cartId` argument.
    #[must_use]
    pub fn is_missing_cart(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::UserError(errors) => errors.iter().any(|e| {
                e.field
                    .as_ref()
                    .is_some_and(|field| field.iter().any(|f| f == "cartId"))
            }),
            _ => false,
        }
    }
}

/// A GraphQL error returned by the Shopify API.
#[derive(Debug, Clone)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,
    /// Source locations in the query.
    pub locations: Vec<GraphQLErrorLocation>,
    /// Path to the error in the response.
    pub path: Vec<serde_json::Value>,
    /// `extensions.code`, if present.
    pub code: Option<String>,
}

impl GraphQLError {
    /// An error with only a message.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: vec![],
            path: vec![],
            code: None,
        }
    }

    /// Whether the error is Shopify's throttling signal.
    #[must_use]
    pub fn is_throttled(&self) -> bool {
        self.code.as_deref() == Some(THROTTLED_CODE)
    }
}

/// Location in a GraphQL query where an error occurred.
#[derive(Debug, Clone)]
pub struct GraphQLErrorLocation {
    /// Line number (1-indexed).
    pub line: i64,
    /// Column number (1-indexed).
    pub column: i64,
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    if errors.is_empty() {
        return "(no error details provided)".to_string();
    }

    errors
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let mut parts = Vec::new();

            if !e.message.is_empty() {
                parts.push(e.message.clone());
            }

            if !e.path.is_empty() {
                let path_str = e
                    .path
                    .iter()
                    .map(|p| match p {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(".");
                parts.push(format!("path: {path_str}"));
            }

            if let Some(loc) = e.locations.first() {
                parts.push(format!("at line {}:{}", loc.line, loc.column));
            }

            if let Some(code) = &e.code {
                parts.push(format!("[{code}]"));
            }

            if parts.is_empty() {
                format!("[error {}]: (no details)", i + 1)
            } else {
                parts.join(" ")
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn format_user_errors(errors: &[UserErrorDto]) -> String {
    errors
        .iter()
        .map(|e| match &e.field {
            Some(field) if !field.is_empty() => format!("{} ({})", e.message, field.join(".")),
            _ => e.message.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}
