//! Session-backed cart store.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use lunchbox_core::cart::{Cart, MenuItem, PersistedCart};
use lunchbox_core::MenuItemId;
use tower_sessions::Session;
use tracing::{debug, warn};

use super::{StoreError, session_from_parts};
use crate::error::AppError;
use crate::models::session_keys;

/// The visitor's cart, rehydrated from their session.
///
/// Every successful mutation is written straight back under
/// [`session_keys::CART`]. A stored cart that fails to restore is discarded
/// and replaced with an empty one.
pub struct CartStore {
    session: Session,
    cart: Cart,
}

impl CartStore {
    /// Rehydrate the cart from `session`.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be read.
    pub async fn load(session: Session) -> Result<Self, StoreError> {
        let cart = match session.get_value(session_keys::CART).await? {
            None => Cart::new(),
            Some(value) => match PersistedCart::restore_value(value) {
                Ok(cart) => cart,
                Err(e) => {
                    warn!(error = %e, "Discarding stored cart");
                    session.remove_value(session_keys::CART).await?;
                    Cart::new()
                }
            },
        };
        Ok(Self { session, cart })
    }

    /// Read-only view of the cart.
    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Add one unit of `item`.
    ///
    /// # Errors
    ///
    /// [`StoreError::Cart`] when the cart refuses the item (other canteen,
    /// negative price); the stored cart is left as it was.
    pub async fn add_item(&mut self, item: MenuItem) -> Result<(), StoreError> {
        debug!(item_id = %item.id, canteen_id = %item.canteen_id, "Adding item to cart");
        self.cart.add_item(item)?;
        self.persist().await
    }

    /// Remove a line. Returns whether anything was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be written.
    pub async fn remove_item(&mut self, id: &MenuItemId) -> Result<bool, StoreError> {
        let removed = self.cart.remove_item(id);
        self.persist().await?;
        Ok(removed)
    }

    /// Set the quantity of a line.
    ///
    /// # Errors
    ///
    /// [`StoreError::Cart`] for a quantity below 1.
    pub async fn update_quantity(&mut self, id: &MenuItemId, quantity: i64) -> Result<(), StoreError> {
        self.cart.update_quantity(id, quantity)?;
        self.persist().await
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be written.
    pub async fn clear(&mut self) -> Result<(), StoreError> {
        self.cart.clear();
        self.persist().await
    }

    async fn persist(&self) -> Result<(), StoreError> {
        self.session
            .insert(session_keys::CART, PersistedCart::from(&self.cart))
            .await?;
        Ok(())
    }
}

impl<S> FromRequestParts<S> for CartStore
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = session_from_parts(parts)?;
        Ok(Self::load(session).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use lunchbox_core::{CanteenId, CartError, Price};
    use rust_decimal::Decimal;
    use tower_sessions::MemoryStore;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn item(id: &str, canteen: &str, rupees: i64) -> MenuItem {
        MenuItem {
            id: MenuItemId::new(id),
            name: id.to_string(),
            price: Price::new(Decimal::from(rupees)),
            canteen_id: CanteenId::new(canteen),
            image_url: None,
            is_veg: Some(true),
        }
    }

    #[tokio::test]
    async fn test_mutations_survive_reload() {
        let session = session();
        let mut store = CartStore::load(session.clone()).await.unwrap();
        store.add_item(item("a", "C1", 100)).await.unwrap();
        store.add_item(item("a", "C1", 100)).await.unwrap();

        let reloaded = CartStore::load(session).await.unwrap();
        assert_eq!(reloaded.cart().item_count(), 2);
        assert_eq!(reloaded.cart().total(), Price::new(Decimal::from(210)));
        assert_eq!(reloaded.cart().canteen_id().unwrap().as_str(), "C1");
    }

    #[tokio::test]
    async fn test_rejected_add_leaves_stored_cart_alone() {
        let session = session();
        let mut store = CartStore::load(session.clone()).await.unwrap();
        store.add_item(item("a", "C1", 100)).await.unwrap();

        let err = store.add_item(item("b", "C2", 50)).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Cart(CartError::ConflictingCanteen { .. })
        ));

        let reloaded = CartStore::load(session).await.unwrap();
        assert_eq!(reloaded.cart().items().len(), 1);
        assert_eq!(reloaded.cart().subtotal(), Price::new(Decimal::from(100)));
    }

    #[tokio::test]
    async fn test_stale_schema_is_discarded() {
        let session = session();
        session
            .insert(
                session_keys::CART,
                serde_json::json!({ "version": 99, "items": [] }),
            )
            .await
            .unwrap();

        let store = CartStore::load(session.clone()).await.unwrap();
        assert!(store.cart().is_empty());
        assert!(session.get_value(session_keys::CART).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_quantity_is_not_persisted() {
        let session = session();
        let mut store = CartStore::load(session.clone()).await.unwrap();
        store.add_item(item("a", "C1", 40)).await.unwrap();

        assert!(store.update_quantity(&MenuItemId::new("a"), 0).await.is_err());
        store.update_quantity(&MenuItemId::new("a"), 3).await.unwrap();

        let reloaded = CartStore::load(session).await.unwrap();
        assert_eq!(reloaded.cart().items()[0].quantity, 3);
    }

    #[tokio::test]
    async fn test_clear_and_remove() {
        let session = session();
        let mut store = CartStore::load(session.clone()).await.unwrap();
        store.add_item(item("a", "C1", 40)).await.unwrap();
        store.add_item(item("b", "C1", 10)).await.unwrap();

        assert!(store.remove_item(&MenuItemId::new("a")).await.unwrap());
        assert!(!store.remove_item(&MenuItemId::new("zzz")).await.unwrap());
        store.clear().await.unwrap();
        store.clear().await.unwrap();

        let reloaded = CartStore::load(session).await.unwrap();
        assert!(reloaded.cart().is_empty());
        assert!(reloaded.cart().canteen_id().is_none());
    }
}
