//! The in-progress order: line items from a single canteen plus derived totals.
//!
//! # Invariants
//!
//! - Every line shares one canteen, and `canteen_id()` is `Some` exactly when
//!   the cart has lines.
//! - `subtotal = Σ price × quantity`, `tax = subtotal × 5%`,
//!   `total = subtotal + tax`. All three are recomputed from the lines after
//!   every mutation; there is no incremental bookkeeping to drift.
//! - A rejected operation leaves the cart untouched. Totals are computed
//!   for the proposed lines first and committed only if they fit.

mod persist;

pub use persist::{CART_SCHEMA_VERSION, PersistedCart, RestoreError};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{CanteenId, MenuItemId, Price};

/// GST charged on canteen orders (5%).
pub const TAX_RATE: Decimal = Decimal::from_parts(5, 0, 0, false, 2);

/// Errors raised by cart commands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// The item belongs to a different canteen than the cart.
    #[error("you can only order from one canteen at a time (cart is from {cart}, item is from {item})")]
    ConflictingCanteen { cart: CanteenId, item: CanteenId },

    /// Quantities must be at least 1.
    #[error("quantity must be at least 1 (got {0})")]
    InvalidQuantity(i64),

    /// Prices cannot be negative.
    #[error("item {0} has a negative price")]
    InvalidPrice(MenuItemId),

    /// The same item appears on two lines.
    #[error("item {0} appears more than once")]
    DuplicateItem(MenuItemId),

    /// A quantity or money amount would exceed what the cart can represent.
    #[error("cart amount too large")]
    AmountTooLarge,
}

/// An item offered for sale, as submitted to [`Cart::add_item`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: MenuItemId,
    pub name: String,
    pub price: Price,
    pub canteen_id: CanteenId,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_veg: Option<bool>,
}

/// A line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: MenuItemId,
    pub name: String,
    pub price: Price,
    pub quantity: u32,
    pub canteen_id: CanteenId,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_veg: Option<bool>,
}

impl CartItem {
    /// Price × quantity for this line, or `None` on overflow.
    ///
    /// Always `Some` for lines of a [`Cart`], whose totals are checked.
    #[must_use]
    pub fn line_total(&self) -> Option<Price> {
        self.price.checked_mul(self.quantity)
    }
}

impl From<MenuItem> for CartItem {
    fn from(item: MenuItem) -> Self {
        Self {
            id: item.id,
            name: item.name,
            price: item.price,
            quantity: 1,
            canteen_id: item.canteen_id,
            image_url: item.image_url,
            is_veg: item.is_veg,
        }
    }
}

/// Derived money amounts of a set of lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Totals {
    subtotal: Price,
    tax: Price,
    total: Price,
}

impl Totals {
    fn of(items: &[CartItem]) -> Result<Self, CartError> {
        let subtotal = items
            .iter()
            .map(CartItem::line_total)
            .try_fold(Price::ZERO, |sum, line| sum.checked_add(line?))
            .ok_or(CartError::AmountTooLarge)?;
        let tax = subtotal
            .checked_scale(TAX_RATE)
            .ok_or(CartError::AmountTooLarge)?;
        let total = subtotal
            .checked_add(tax)
            .ok_or(CartError::AmountTooLarge)?;
        Ok(Self {
            subtotal,
            tax,
            total,
        })
    }
}

/// Shopping cart holding items from at most one canteen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    items: Vec<CartItem>,
    canteen_id: Option<CanteenId>,
    totals: Totals,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cart from existing lines, checking every invariant.
    ///
    /// Used when rehydrating persisted state. Totals are computed here and
    /// never taken from the caller.
    ///
    /// # Errors
    ///
    /// Returns the first violation found: mixed canteens, a quantity below 1,
    /// a negative price, a repeated item id, or totals too large to represent.
    pub fn from_items(items: Vec<CartItem>) -> Result<Self, CartError> {
        let canteen_id = items.first().map(|item| item.canteen_id.clone());

        for (index, item) in items.iter().enumerate() {
            if let Some(cart) = &canteen_id
                && *cart != item.canteen_id
            {
                return Err(CartError::ConflictingCanteen {
                    cart: cart.clone(),
                    item: item.canteen_id.clone(),
                });
            }
            if item.quantity < 1 {
                return Err(CartError::InvalidQuantity(i64::from(item.quantity)));
            }
            if item.price.is_negative() {
                return Err(CartError::InvalidPrice(item.id.clone()));
            }
            if items.iter().take(index).any(|earlier| earlier.id == item.id) {
                return Err(CartError::DuplicateItem(item.id.clone()));
            }
        }

        let totals = Totals::of(&items)?;
        Ok(Self {
            items,
            canteen_id,
            totals,
        })
    }

    /// Add one unit of `item`.
    ///
    /// An item already in the cart has its quantity bumped by one; the
    /// incoming name, price and image are ignored in that case.
    ///
    /// # Errors
    ///
    /// - [`CartError::ConflictingCanteen`] if the cart already holds items
    ///   from another canteen.
    /// - [`CartError::InvalidPrice`] if the item's price is negative.
    /// - [`CartError::AmountTooLarge`] if the quantity or the totals would
    ///   overflow.
    pub fn add_item(&mut self, item: MenuItem) -> Result<(), CartError> {
        if let Some(current) = &self.canteen_id
            && *current != item.canteen_id
        {
            return Err(CartError::ConflictingCanteen {
                cart: current.clone(),
                item: item.canteen_id,
            });
        }
        if item.price.is_negative() {
            return Err(CartError::InvalidPrice(item.id));
        }

        let canteen_id = item.canteen_id.clone();
        let mut items = self.items.clone();
        if let Some(existing) = items.iter_mut().find(|line| line.id == item.id) {
            existing.quantity = existing
                .quantity
                .checked_add(1)
                .ok_or(CartError::AmountTooLarge)?;
        } else {
            items.push(CartItem::from(item));
        }

        self.commit(items, Some(canteen_id))
    }

    /// Remove the line for `id`. Returns whether a line was removed.
    ///
    /// Removing an absent id is a no-op. The canteen is released once the
    /// last line goes; otherwise it stays as it was.
    pub fn remove_item(&mut self, id: &MenuItemId) -> bool {
        let Some(index) = self.items.iter().position(|line| line.id == *id) else {
            return false;
        };

        let mut items = self.items.clone();
        items.remove(index);
        let canteen_id = if items.is_empty() {
            None
        } else {
            self.canteen_id.clone()
        };
        // Dropping a line only shrinks totals that already fit
        self.commit(items, canteen_id).is_ok()
    }

    /// Set the quantity of the line for `id`.
    ///
    /// An absent id leaves the cart unchanged.
    ///
    /// # Errors
    ///
    /// [`CartError::InvalidQuantity`] if `quantity` is below 1 or does not
    /// fit a line quantity. Zero is rejected rather than treated as removal.
    /// [`CartError::AmountTooLarge`] if the new totals would overflow.
    pub fn update_quantity(&mut self, id: &MenuItemId, quantity: i64) -> Result<(), CartError> {
        let quantity = u32::try_from(quantity)
            .ok()
            .filter(|q| *q >= 1)
            .ok_or(CartError::InvalidQuantity(quantity))?;

        let Some(index) = self.items.iter().position(|line| line.id == *id) else {
            return Ok(());
        };

        let mut items = self.items.clone();
        if let Some(line) = items.get_mut(index) {
            line.quantity = quantity;
        }
        self.commit(items, self.canteen_id.clone())
    }

    /// Empty the cart. Idempotent.
    pub fn clear(&mut self) {
        self.items.clear();
        self.canteen_id = None;
        self.totals = Totals::default();
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// The canteen every line belongs to, if any.
    #[must_use]
    pub const fn canteen_id(&self) -> Option<&CanteenId> {
        self.canteen_id.as_ref()
    }

    #[must_use]
    pub const fn subtotal(&self) -> Price {
        self.totals.subtotal
    }

    #[must_use]
    pub const fn tax(&self) -> Price {
        self.totals.tax
    }

    #[must_use]
    pub const fn total(&self) -> Price {
        self.totals.total
    }

    /// Total number of units across all lines (the header badge).
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |count, line| count.saturating_add(line.quantity))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Replace the lines if their totals fit; otherwise change nothing.
    fn commit(
        &mut self,
        items: Vec<CartItem>,
        canteen_id: Option<CanteenId>,
    ) -> Result<(), CartError> {
        self.totals = Totals::of(&items)?;
        self.items = items;
        self.canteen_id = canteen_id;
        Ok(())
    }
}
