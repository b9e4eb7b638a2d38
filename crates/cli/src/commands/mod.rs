//! Cart commands.
//!
//! Every invocation restores the persisted cart, runs one manager
//! operation, then prints the notifications it produced and the resulting
//! cart.

mod render;

use std::path::Path;
use std::time::Duration;

use shopcart_client::{
    CartError, CartManager, FileCartIdStore, Notification, NotificationLevel, ProxyClient,
    ProxyClientError,
};
use shopcart_core::{CartLineId, Quantity, QuantityError, VariantId};
use thiserror::Error;
use tokio::sync::broadcast;

/// Errors that end a command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("HTTP client setup failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Proxy(#[from] ProxyClientError),
    #[error("invalid quantity: {0}")]
    Quantity(#[from] QuantityError),
    #[error(transparent)]
    Cart(#[from] CartError),
    #[error("the cart is empty")]
    EmptyCart,
}

/// A restored cart manager plus its notification feed.
pub struct Session {
    manager: CartManager<ProxyClient, FileCartIdStore>,
    notifications: broadcast::Receiver<Notification>,
}

impl Session {
    /// Connect to the proxy and restore the persisted cart.
    pub async fn open(
        proxy_url: &str,
        state_dir: &Path,
        timeout_secs: u64,
    ) -> Result<Self, CommandError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        let backend = ProxyClient::with_client(proxy_url, http)?;
        let manager = CartManager::new(backend, FileCartIdStore::new(state_dir));
        let notifications = manager.notifications();

        manager.restore().await;
        tracing::debug!(restored = manager.cart().is_some(), "Session opened");

        Ok(Self {
            manager,
            notifications,
        })
    }

    pub fn show(mut self) -> Result<(), CommandError> {
        self.report();
        Ok(())
    }

    pub async fn add(mut self, variant_id: &str, quantity: u32) -> Result<(), CommandError> {
        let quantity = Quantity::new(quantity)?;
        let result = self
            .manager
            .add_item(VariantId::new(variant_id), quantity)
            .await;
        self.report();
        result.map(drop).map_err(Into::into)
    }

    pub async fn update(mut self, line_id: &str, quantity: u32) -> Result<(), CommandError> {
        let result = self
            .manager
            .update_line_quantity(&CartLineId::new(line_id), quantity)
            .await;
        self.report();
        result.map(drop).map_err(Into::into)
    }

    pub async fn increment(mut self, line_id: &str) -> Result<(), CommandError> {
        let result = self.manager.increment_line(&CartLineId::new(line_id)).await;
        self.report();
        result.map(drop).map_err(Into::into)
    }

    pub async fn decrement(mut self, line_id: &str) -> Result<(), CommandError> {
        let result = self.manager.decrement_line(&CartLineId::new(line_id)).await;
        self.report();
        result.map(drop).map_err(Into::into)
    }

    pub async fn remove(mut self, line_id: &str) -> Result<(), CommandError> {
        let result = self.manager.remove_line(&CartLineId::new(line_id)).await;
        self.report();
        result.map(drop).map_err(Into::into)
    }

    pub fn clear(mut self) {
        self.manager.clear();
        self.report();
    }

    pub fn checkout(self) -> Result<(), CommandError> {
        if self.manager.is_empty() {
            return Err(CommandError::EmptyCart);
        }
        match self.manager.checkout_url() {
            Some(url) => {
                emit(&url);
                Ok(())
            }
            None => Err(CommandError::EmptyCart),
        }
    }

    /// Print pending notifications, then the cart.
    fn report(&mut self) {
        while let Ok(notification) = self.notifications.try_recv() {
            let prefix = match notification.level {
                NotificationLevel::Success => "ok",
                NotificationLevel::Error => "error",
            };
            emit(&format!("{prefix}: {}", notification.message.replace('\n', " - ")));
        }
        emit(&render::cart_summary(&self.manager.state()));
    }
}

#[allow(clippy::print_stdout)]
fn emit(text: &str) {
    println!("{text}");
}
