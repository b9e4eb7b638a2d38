//! Cart error taxonomy.
//!
//! Every failure a cart operation can hit is mapped into [`CartError`] at the
//! backend boundary. The manager then decides, per variant, whether local
//! state must be discarded and which message the shopper sees.

use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by cart operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// Bad local input or a rejected request; for local checks no network
    /// call was made.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The stored cart ID no longer refers to a live cart.
    #[error("Cart expired")]
    CartExpired,

    /// The backend is throttling requests.
    #[error("Rate limited")]
    RateLimited,

    /// No cart exists for the stored ID.
    #[error("Cart not found")]
    NotFound,

    /// The backend could not allocate stock for the line.
    #[error("Out of stock: {message}")]
    OutOfStock {
        /// Backend message.
        message: String,
        /// Longer explanation, if any.
        details: Option<String>,
    },

    /// Catch-all backend or transport failure.
    #[error("Remote error: {message}")]
    Remote {
        /// Backend or transport message.
        message: String,
        /// Longer explanation, if any.
        details: Option<String>,
        /// HTTP status, when a response was received.
        status: Option<u16>,
    },
}

impl CartError {
    /// Catch-all failure without an HTTP status (transport or decoding).
    pub fn remote(message: impl Into<String>, details: Option<String>) -> Self {
        Self::Remote {
            message: message.into(),
            details,
            status: None,
        }
    }

    /// The variant as a plain tag.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::CartExpired => ErrorKind::CartExpired,
            Self::RateLimited => ErrorKind::RateLimited,
            Self::NotFound => ErrorKind::NotFound,
            Self::OutOfStock { .. } => ErrorKind::OutOfStock,
            Self::Remote { .. } => ErrorKind::Remote,
        }
    }

    /// Whether the error proves the locally held cart ID is dead.
    #[must_use]
    pub const fn invalidates_cart(&self) -> bool {
        matches!(self, Self::CartExpired | Self::NotFound)
    }

    /// The most specific backend-supplied text, if there is any.
    ///
    /// Details, when present, are appended on a new line.
    #[must_use]
    pub fn detail_message(&self) -> Option<String> {
        let (message, details) = match self {
            Self::Validation(message) => (message.as_str(), None),
            Self::OutOfStock { message, details } | Self::Remote { message, details, .. } => {
                (message.as_str(), details.as_deref())
            }
            Self::CartExpired | Self::RateLimited | Self::NotFound => return None,
        };

        match (message.trim(), details.map(str::trim)) {
            ("", None | Some("")) => None,
            ("", Some(details)) => Some(format!("Product unavailable\n{details}")),
            (message, None | Some("")) => Some(message.to_string()),
            (message, Some(details)) => Some(format!("{message}\n{details}")),
        }
    }
}

/// Tag-only view of [`CartError`], for state snapshots and UI branching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    CartExpired,
    RateLimited,
    NotFound,
    OutOfStock,
    Remote,
}

/// The last error shown to the shopper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    /// What kind of failure it was.
    pub kind: ErrorKind,
    /// The message that was displayed.
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_message_prefers_details() {
        let err = CartError::Remote {
            message: "Unable to add item to cart".to_string(),
            details: Some("Variant is archived".to_string()),
            status: Some(500),
        };
        assert_eq!(
            err.detail_message().as_deref(),
            Some("Unable to add item to cart\nVariant is archived")
        );
    }

    #[test]
    fn test_detail_message_without_error_text() {
        let err = CartError::OutOfStock {
            message: String::new(),
            details: Some("Shopify returned quantity 0".to_string()),
        };
        assert_eq!(
            err.detail_message().as_deref(),
            Some("Product unavailable\nShopify returned quantity 0")
        );
    }

    #[test]
    fn test_detail_message_absent_for_signals() {
        assert_eq!(CartError::CartExpired.detail_message(), None);
        assert_eq!(CartError::RateLimited.detail_message(), None);
        assert_eq!(CartError::remote("  ", None).detail_message(), None);
    }

    #[test]
    fn test_invalidates_cart() {
        assert!(CartError::CartExpired.invalidates_cart());
        assert!(CartError::NotFound.invalidates_cart());
        assert!(!CartError::RateLimited.invalidates_cart());
        assert!(!CartError::Validation("x".to_string()).invalidates_cart());
    }
}
