//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ShopifyStorefrontConfig;
use crate::shopify::StorefrontClient;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone, Debug)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

#[derive(Debug)]
struct AppStateInner {
    storefront: StorefrontClient,
}

impl AppState {
    /// Build state from Shopify configuration.
    #[must_use]
    pub fn new(shopify: &ShopifyStorefrontConfig) -> Self {
        Self::with_storefront(StorefrontClient::new(shopify))
    }

    /// Build state around an existing client.
    #[must_use]
    pub fn with_storefront(storefront: StorefrontClient) -> Self {
        Self {
            inner: Arc::new(AppStateInner { storefront }),
        }
    }

    /// Get a reference to the Shopify Storefront API client.
    #[must_use]
    pub fn storefront(&self) -> &StorefrontClient {
        &self.inner.storefront
    }
}
