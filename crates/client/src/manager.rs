//! The cart state manager.
//!
//! [`CartManager`] owns the in-memory cart snapshot, the persisted cart ID,
//! and the shopper-visible status (busy flag, last error, drawer). Every
//! mutation is a full round-trip: the snapshot is replaced with whatever the
//! backend returns, never patched locally.
//!
//! Remote operations are serialized through a single-flight lock, so a
//! double-clicked "add to cart" runs after the first click has finished and
//! sees the cart it created.

use shopcart_core::{Cart, CartId, CartLineId, Quantity, VariantId};
use tokio::sync::{Mutex, broadcast, watch};
use tracing::{debug, info, instrument, warn};

use crate::backend::CartBackend;
use crate::error::{CartError, ErrorInfo};
use crate::flow::{AddFlow, Attempt, AttemptOutcome};
use crate::state::{CartState, Notification};
use crate::storage::CartIdStore;

/// Shopper-facing messages.
pub mod messages {
    pub const ADDED: &str = "Added to cart!";
    pub const ADD_FAILED: &str = "Failed to add to cart";
    pub const RETRY_FAILED: &str = "Failed to create new cart. Please refresh the page.";
    pub const RATE_LIMITED: &str = "Too many requests. Please wait a moment and try again.";
    pub const UPDATED: &str = "Quantity updated!";
    pub const UPDATE_FAILED: &str = "Failed to update quantity";
    pub const INVALID_UPDATE: &str = "Invalid update request";
    pub const MAYBE_OUT_OF_STOCK: &str =
        "Unable to update. Item may be out of stock or no longer available.";
    pub const REMOVE_FAILED: &str = "Failed to remove item";
    pub const INVALID_REMOVE: &str = "Invalid remove request";
    pub const CART_GONE: &str = "Your cart has expired. Please add your items again.";
    pub const CART_NOT_FOUND: &str = "Your cart could not be found.";
}

const NOTIFICATION_CAPACITY: usize = 32;

/// Resets `is_busy` when dropped, whichever way the operation ends.
struct BusyGuard<'a> {
    state: &'a watch::Sender<CartState>,
}

impl<'a> BusyGuard<'a> {
    fn new(state: &'a watch::Sender<CartState>) -> Self {
        state.send_modify(|s| s.is_busy = true);
        Self { state }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.state.send_modify(|s| s.is_busy = false);
    }
}

/// Client-side cart state container.
///
/// Create one per session with [`CartManager::new`], call
/// [`CartManager::restore`] once, and share it (e.g. behind an `Arc`) with
/// everything that renders or mutates the cart.
pub struct CartManager<B, S> {
    backend: B,
    store: S,
    state: watch::Sender<CartState>,
    notifications: broadcast::Sender<Notification>,
    op_lock: Mutex<()>,
}

impl<B, S> std::fmt::Debug for CartManager<B, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartManager")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl<B: CartBackend, S: CartIdStore> CartManager<B, S> {
    /// Create a manager with an empty cart.
    #[must_use]
    pub fn new(backend: B, store: S) -> Self {
        let (state, _) = watch::channel(CartState::default());
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            backend,
            store,
            state,
            notifications,
            op_lock: Mutex::new(()),
        }
    }

    // =========================================================================
    // Observation
    // =========================================================================

    /// Subscribe to state changes. The receiver starts at the current state.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.state.subscribe()
    }

    /// Subscribe to toast-style notifications.
    #[must_use]
    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    /// Copy of the current state.
    #[must_use]
    pub fn state(&self) -> CartState {
        self.state.borrow().clone()
    }

    /// Copy of the current cart.
    #[must_use]
    pub fn cart(&self) -> Option<Cart> {
        self.state.borrow().cart.clone()
    }

    /// Sum of all line quantities.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.state.borrow().item_count()
    }

    /// Cart total with currency code.
    #[must_use]
    pub fn total_cost(&self) -> Option<String> {
        self.state.borrow().total_cost()
    }

    /// No cart, or no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.borrow().is_empty()
    }

    /// Checkout URL of the active cart.
    #[must_use]
    pub fn checkout_url(&self) -> Option<String> {
        self.state.borrow().checkout_url().map(str::to_string)
    }

    /// The backend this manager talks to.
    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Load the persisted cart, if any.
    ///
    /// Any failure (unreadable storage, unknown cart, backend down) silently
    /// discards the stored ID and leaves the cart empty.
    #[instrument(skip(self))]
    pub async fn restore(&self) {
        let _op = self.op_lock.lock().await;

        let cart_id = match self.store.load() {
            Ok(Some(id)) => id,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "Stored cart ID unreadable, discarding");
                self.forget_cart_id();
                return;
            }
        };

        let _busy = BusyGuard::new(&self.state);
        match self.backend.fetch_cart(&cart_id).await {
            Ok(cart) => {
                debug!(cart_id = %cart.id, lines = cart.lines.len(), "Restored cart");
                self.store_snapshot(cart);
            }
            Err(e) => {
                info!(cart_id = %cart_id, error = %e, "Stored cart unavailable, clearing");
                self.drop_local_cart();
            }
        }
    }

    /// Add one unit of a variant.
    ///
    /// # Errors
    ///
    /// See [`Self::add_item`].
    pub async fn add_one(&self, variant_id: VariantId) -> Result<Cart, CartError> {
        self.add_item(variant_id, Quantity::ONE).await
    }

    /// Add a variant to the cart, creating the cart if there is none.
    ///
    /// An expired cart is dropped and the add retried once against a new
    /// cart. Lines are never merged locally; if the variant is already in the
    /// cart, the backend decides how to consolidate.
    ///
    /// # Errors
    ///
    /// Returns the error that ended the flow. State, `last_error` and
    /// notifications are already updated when this returns.
    #[instrument(skip(self), fields(variant_id = %variant_id, quantity = %quantity))]
    pub async fn add_item(
        &self,
        variant_id: VariantId,
        quantity: Quantity,
    ) -> Result<Cart, CartError> {
        let _op = self.op_lock.lock().await;

        if variant_id.is_blank() {
            let err = CartError::Validation("variantId is required".to_string());
            self.fail(&err, messages::ADD_FAILED.to_string());
            return Err(err);
        }

        let _busy = BusyGuard::new(&self.state);
        self.clear_last_error();

        let mut flow = AddFlow::new();
        flow.start();
        let mut last_error = None;

        while let Some(attempt) = flow.next_attempt() {
            let cart_id = match attempt {
                Attempt::Initial => self.current_cart_id(),
                Attempt::FreshCart => None,
            };

            let result = match &cart_id {
                Some(id) => self.backend.add_line(id, &variant_id, quantity).await,
                None => self.backend.create_cart(&variant_id, quantity).await,
            };

            match result {
                Ok(cart) => {
                    flow.record(AttemptOutcome::Succeeded);
                    self.store_snapshot(cart.clone());
                    self.state.send_modify(|s| {
                        s.last_error = None;
                        s.is_drawer_open = true;
                    });
                    self.notify(Notification::success(messages::ADDED));
                    return Ok(cart);
                }
                Err(e) if e.invalidates_cart() => {
                    info!(error = %e, retry = !flow.retried(), "Cart expired during add");
                    self.drop_local_cart();
                    flow.record(AttemptOutcome::Expired);
                    last_error = Some(e);
                }
                Err(e) => {
                    flow.record(AttemptOutcome::Failed);
                    last_error = Some(e);
                }
            }
        }

        let err = last_error.unwrap_or_else(|| CartError::remote(messages::ADD_FAILED, None));
        let message = if flow.retried() {
            messages::RETRY_FAILED.to_string()
        } else {
            match &err {
                CartError::RateLimited => messages::RATE_LIMITED.to_string(),
                other => other
                    .detail_message()
                    .unwrap_or_else(|| messages::ADD_FAILED.to_string()),
            }
        };
        self.fail(&err, message);
        Err(err)
    }

    /// Set a line's quantity.
    ///
    /// Requires an active cart, a non-empty line ID and `quantity >= 1`;
    /// otherwise fails with [`CartError::Validation`] without any request.
    /// A server-side failure triggers a best-effort resync of the cart.
    ///
    /// # Errors
    ///
    /// Returns the validation or backend error. State, `last_error` and
    /// notifications are already updated when this returns.
    #[instrument(skip(self), fields(line_id = %line_id))]
    pub async fn update_line_quantity(
        &self,
        line_id: &CartLineId,
        quantity: u32,
    ) -> Result<Cart, CartError> {
        let _op = self.op_lock.lock().await;

        let (cart_id, quantity) = match (self.current_cart_id(), Quantity::new(quantity)) {
            (Some(cart_id), Ok(quantity)) if !line_id.is_blank() => (cart_id, quantity),
            _ => return Err(self.invalid(messages::INVALID_UPDATE)),
        };

        self.send_quantity(&cart_id, line_id, quantity).await
    }

    /// Increase a line's quantity by one.
    ///
    /// # Errors
    ///
    /// See [`Self::update_line_quantity`]; also fails validation if the line
    /// is not in the cart.
    pub async fn increment_line(&self, line_id: &CartLineId) -> Result<Cart, CartError> {
        self.step_line(line_id, Quantity::increment).await
    }

    /// Decrease a line's quantity by one, stopping at 1.
    ///
    /// A line already at 1 is left alone and no request is sent; use
    /// [`Self::remove_line`] to delete it.
    ///
    /// # Errors
    ///
    /// See [`Self::update_line_quantity`]; also fails validation if the line
    /// is not in the cart.
    pub async fn decrement_line(&self, line_id: &CartLineId) -> Result<Cart, CartError> {
        self.step_line(line_id, Quantity::decrement).await
    }

    /// Remove a line. Removing the last line leaves a valid, empty cart.
    ///
    /// # Errors
    ///
    /// Returns the validation or backend error; the previous snapshot is kept
    /// unless the cart itself is gone.
    #[instrument(skip(self), fields(line_id = %line_id))]
    pub async fn remove_line(&self, line_id: &CartLineId) -> Result<Cart, CartError> {
        let _op = self.op_lock.lock().await;

        let cart_id = match self.current_cart_id() {
            Some(cart_id) if !line_id.is_blank() => cart_id,
            _ => return Err(self.invalid(messages::INVALID_REMOVE)),
        };

        let _busy = BusyGuard::new(&self.state);
        self.clear_last_error();

        match self.backend.remove_line(&cart_id, line_id).await {
            Ok(cart) => {
                self.store_snapshot(cart.clone());
                Ok(cart)
            }
            Err(e) => {
                let message = self.common_failure_message(&e, messages::REMOVE_FAILED);
                self.fail(&e, message);
                Err(e)
            }
        }
    }

    /// Re-fetch the active cart.
    ///
    /// Unlike [`Self::restore`], a missing cart is reported to the shopper.
    /// Without an active cart this is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the backend error; `NotFound`/`CartExpired` also clear the cart.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Option<Cart>, CartError> {
        let _op = self.op_lock.lock().await;

        let Some(cart_id) = self.current_cart_id() else {
            return Ok(None);
        };

        let _busy = BusyGuard::new(&self.state);
        match self.backend.fetch_cart(&cart_id).await {
            Ok(cart) => {
                self.store_snapshot(cart.clone());
                self.clear_last_error();
                Ok(Some(cart))
            }
            Err(e) => {
                let message = if e.invalidates_cart() {
                    self.drop_local_cart();
                    messages::CART_NOT_FOUND.to_string()
                } else {
                    self.common_failure_message(&e, "Failed to load cart")
                };
                self.fail(&e, message);
                Err(e)
            }
        }
    }

    /// Forget the cart locally: drop the snapshot and the stored ID.
    ///
    /// Synchronous, makes no request, and is safe to call in any state.
    #[instrument(skip(self))]
    pub fn clear(&self) {
        self.drop_local_cart();
    }

    /// Show the cart drawer.
    pub fn open_drawer(&self) {
        self.state.send_modify(|s| s.is_drawer_open = true);
    }

    /// Hide the cart drawer.
    pub fn close_drawer(&self) {
        self.state.send_modify(|s| s.is_drawer_open = false);
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn step_line(
        &self,
        line_id: &CartLineId,
        step: fn(Quantity) -> Quantity,
    ) -> Result<Cart, CartError> {
        let _op = self.op_lock.lock().await;

        let current = self.state.borrow().cart.clone();
        let Some(cart) = current else {
            return Err(self.invalid(messages::INVALID_UPDATE));
        };
        let Some(line) = cart.line(line_id) else {
            return Err(self.invalid(messages::INVALID_UPDATE));
        };

        let quantity = step(line.quantity);
        if quantity == line.quantity {
            debug!(quantity = %quantity, "Quantity unchanged, skipping request");
            return Ok(cart);
        }

        self.send_quantity(&cart.id, line_id, quantity).await
    }

    /// Issue the update and handle the outcome. Caller holds the op lock.
    async fn send_quantity(
        &self,
        cart_id: &CartId,
        line_id: &CartLineId,
        quantity: Quantity,
    ) -> Result<Cart, CartError> {
        let _busy = BusyGuard::new(&self.state);
        self.clear_last_error();

        match self
            .backend
            .update_line_quantity(cart_id, line_id, quantity)
            .await
        {
            Ok(cart) => {
                self.store_snapshot(cart.clone());
                self.notify(Notification::success(messages::UPDATED));
                Ok(cart)
            }
            Err(e @ (CartError::Remote { .. } | CartError::OutOfStock { .. })) => {
                self.fail(&e, messages::MAYBE_OUT_OF_STOCK.to_string());
                match self.backend.fetch_cart(cart_id).await {
                    Ok(cart) => self.store_snapshot(cart),
                    Err(refetch) if refetch.invalidates_cart() => {
                        info!(error = %refetch, "Cart gone after failed update, clearing");
                        self.drop_local_cart();
                    }
                    Err(refetch) => warn!(error = %refetch, "Failed to refetch cart"),
                }
                Err(e)
            }
            Err(e) => {
                let message = self.common_failure_message(&e, messages::UPDATE_FAILED);
                self.fail(&e, message);
                Err(e)
            }
        }
    }

    /// Message for failures every operation handles the same way. Drops the
    /// local cart when the error says it is gone.
    fn common_failure_message(&self, err: &CartError, fallback: &str) -> String {
        match err {
            CartError::CartExpired | CartError::NotFound => {
                self.drop_local_cart();
                messages::CART_GONE.to_string()
            }
            CartError::RateLimited => messages::RATE_LIMITED.to_string(),
            CartError::Validation(_) => err
                .detail_message()
                .unwrap_or_else(|| fallback.to_string()),
            CartError::OutOfStock { .. } | CartError::Remote { .. } => fallback.to_string(),
        }
    }

    fn current_cart_id(&self) -> Option<CartId> {
        self.state.borrow().cart.as_ref().map(|cart| cart.id.clone())
    }

    /// Replace the snapshot and persist its ID.
    fn store_snapshot(&self, cart: Cart) {
        if let Err(e) = self.store.save(&cart.id) {
            warn!(error = %e, "Failed to persist cart ID");
        }
        self.state.send_modify(|s| s.cart = Some(cart));
    }

    fn drop_local_cart(&self) {
        self.state.send_modify(|s| s.cart = None);
        self.forget_cart_id();
    }

    fn forget_cart_id(&self) {
        if let Err(e) = self.store.remove() {
            warn!(error = %e, "Failed to remove stored cart ID");
        }
    }

    fn clear_last_error(&self) {
        self.state.send_if_modified(|s| s.last_error.take().is_some());
    }

    fn invalid(&self, message: &str) -> CartError {
        let err = CartError::Validation(message.to_string());
        self.fail(&err, message.to_string());
        err
    }

    fn fail(&self, err: &CartError, message: String) {
        warn!(error = %err, message = %message, "Cart operation failed");
        self.state.send_modify(|s| {
            s.last_error = Some(ErrorInfo {
                kind: err.kind(),
                message: message.clone(),
            });
        });
        self.notify(Notification::error(message));
    }

    fn notify(&self, notification: Notification) {
        // No subscribers is fine
        let _ = self.notifications.send(notification);
    }
}
