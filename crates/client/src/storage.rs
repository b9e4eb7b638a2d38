//! Persistence of the active cart ID.
//!
//! Exactly one key is stored: the cart ID under [`CART_ID_KEY`]. There is no
//! schema versioning. A value that turns out to be invalid is simply deleted
//! by the manager.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use shopcart_core::CartId;
use thiserror::Error;

/// Key under which the cart ID is stored.
pub const CART_ID_KEY: &str = "cartId";

/// File name used by [`FileCartIdStore`].
pub const CART_FILE_NAME: &str = "cart.json";

/// Errors raised by a [`CartIdStore`].
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem access failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },

    /// The stored value could not be decoded.
    #[error("Corrupt cart file {path}: {source}")]
    Corrupt {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },
}

/// Client-side persistent storage for the cart ID.
pub trait CartIdStore: Send + Sync {
    /// Read the stored ID, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read or decoded.
    fn load(&self) -> Result<Option<CartId>, StorageError>;

    /// Store an ID, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn save(&self, cart_id: &CartId) -> Result<(), StorageError>;

    /// Delete the stored ID. Succeeds when nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be modified.
    fn remove(&self) -> Result<(), StorageError>;
}

impl<T: CartIdStore + ?Sized> CartIdStore for Arc<T> {
    fn load(&self) -> Result<Option<CartId>, StorageError> {
        (**self).load()
    }

    fn save(&self, cart_id: &CartId) -> Result<(), StorageError> {
        (**self).save(cart_id)
    }

    fn remove(&self) -> Result<(), StorageError> {
        (**self).remove()
    }
}

// =============================================================================
// In-memory store
// =============================================================================

/// In-memory store, for hosts without persistent storage and for tests.
///
/// Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryCartIdStore {
    slot: Arc<Mutex<Option<CartId>>>,
}

impl MemoryCartIdStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds an ID.
    #[must_use]
    pub fn with_id(cart_id: CartId) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(cart_id))),
        }
    }

    /// Current value, for inspection.
    #[must_use]
    pub fn get(&self) -> Option<CartId> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CartIdStore for MemoryCartIdStore {
    fn load(&self) -> Result<Option<CartId>, StorageError> {
        Ok(self.get())
    }

    fn save(&self, cart_id: &CartId) -> Result<(), StorageError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(cart_id.clone());
        Ok(())
    }

    fn remove(&self) -> Result<(), StorageError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

// =============================================================================
// File-backed store
// =============================================================================

#[derive(Serialize, Deserialize)]
struct CartFile {
    #[serde(rename = "cartId")]
    cart_id: Option<CartId>,
}

/// Stores the cart ID as `{"cartId": "..."}` in `<dir>/cart.json`.
#[derive(Debug, Clone)]
pub struct FileCartIdStore {
    path: PathBuf,
}

impl FileCartIdStore {
    /// Store inside `dir`. The directory is created on first save.
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(CART_FILE_NAME),
        }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl CartIdStore for FileCartIdStore {
    fn load(&self) -> Result<Option<CartId>, StorageError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };

        let file: CartFile =
            serde_json::from_str(&contents).map_err(|source| StorageError::Corrupt {
                path: self.path.clone(),
                source,
            })?;

        Ok(file.cart_id.filter(|id| !id.is_blank()))
    }

    fn save(&self, cart_id: &CartId) -> Result<(), StorageError> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| self.io_error(e))?;
        }

        let contents = serde_json::to_string(&CartFile {
            cart_id: Some(cart_id.clone()),
        })
        .map_err(|source| StorageError::Corrupt {
            path: self.path.clone(),
            source,
        })?;

        // Write-then-rename so a crash never leaves a half-written file
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, contents).map_err(|e| self.io_error(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))
    }

    fn remove(&self) -> Result<(), StorageError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("shopcart-store-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryCartIdStore::new();
        assert_eq!(store.load().unwrap(), None);

        store.save(&CartId::new("gid://shopify/Cart/1")).unwrap();
        assert_eq!(store.get(), Some(CartId::new("gid://shopify/Cart/1")));

        store.remove().unwrap();
        store.remove().unwrap();
        assert_eq!(store.get(), None);
    }

    #[test]
    fn test_memory_store_clones_share_slot() {
        let store = MemoryCartIdStore::new();
        let other = store.clone();
        store.save(&CartId::new("c")).unwrap();
        assert_eq!(other.get(), Some(CartId::new("c")));
    }

    #[test]
    fn test_file_store_roundtrip() {
        let dir = temp_dir();
        let store = FileCartIdStore::new(&dir);
        assert_eq!(store.load().unwrap(), None);

        store.save(&CartId::new("gid://shopify/Cart/abc")).unwrap();
        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(raw, r#"{"cartId":"gid://shopify/Cart/abc"}"#);
        assert_eq!(
            FileCartIdStore::new(&dir).load().unwrap(),
            Some(CartId::new("gid://shopify/Cart/abc"))
        );

        store.remove().unwrap();
        assert_eq!(store.load().unwrap(), None);
        store.remove().unwrap();

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_file_store_corrupt_file() {
        let dir = temp_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let store = FileCartIdStore::new(&dir);
        std::fs::write(store.path(), "not json").unwrap();

        assert!(matches!(store.load(), Err(StorageError::Corrupt { .. })));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_file_store_blank_id_is_none() {
        let dir = temp_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let store = FileCartIdStore::new(&dir);
        std::fs::write(store.path(), r#"{"cartId":""}"#).unwrap();

        assert_eq!(store.load().unwrap(), None);

        std::fs::remove_dir_all(&dir).ok();
    }
}
