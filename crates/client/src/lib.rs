//! shopcart client - cart state manager.
//!
//! [`CartManager`] keeps the shopper's cart in sync with the checkout proxy:
//! it restores the persisted cart on startup, runs every mutation as a
//! round-trip, recovers from expired carts, and publishes state and
//! notifications for the view layer.
//!
//! # Example
//!
//! ```no_run
//! use shopcart_client::{CartManager, FileCartIdStore, ProxyClient};
//! use shopcart_core::VariantId;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = ProxyClient::new("http://127.0.0.1:3000")?;
//! let manager = CartManager::new(backend, FileCartIdStore::new(".shopcart"));
//!
//! manager.restore().await;
//! manager
//!     .add_one(VariantId::new("gid://shopify/ProductVariant/1"))
//!     .await?;
//! println!("{} items", manager.item_count());
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod error;
pub mod flow;
pub mod manager;
pub mod proxy;
pub mod state;
pub mod storage;

pub use backend::CartBackend;
pub use error::{CartError, ErrorInfo, ErrorKind};
pub use manager::{CartManager, messages};
pub use proxy::{ProxyClient, ProxyClientError, classify};
pub use state::{CartState, Notification, NotificationLevel};
pub use storage::{CartIdStore, FileCartIdStore, MemoryCartIdStore, StorageError};
