//! Versioned storage envelope for a [`Cart`].
//!
//! Only the lines are stored. Derived totals are recomputed on restore, and
//! anything that fails the version check or the cart invariants is refused so
//! the caller can start from an empty cart instead.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Cart, CartError, CartItem};

/// Current schema version of the persisted cart.
pub const CART_SCHEMA_VERSION: u32 = 1;

/// Why a stored cart could not be restored.
#[derive(Debug, Error)]
pub enum RestoreError {
    /// Written by a different schema version.
    #[error("cart schema version {found} does not match {expected}")]
    VersionMismatch { found: u32, expected: u32 },

    /// Not a cart envelope at all.
    #[error("malformed cart payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Well-formed but breaks a cart invariant.
    #[error("stored cart is inconsistent: {0}")]
    Inconsistent(#[from] CartError),
}

/// On-disk form of a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedCart {
    pub version: u32,
    pub items: Vec<CartItem>,
}

impl From<&Cart> for PersistedCart {
    fn from(cart: &Cart) -> Self {
        Self {
            version: CART_SCHEMA_VERSION,
            items: cart.items().to_vec(),
        }
    }
}

impl PersistedCart {
    /// Turn the envelope back into a cart.
    ///
    /// # Errors
    ///
    /// [`RestoreError::VersionMismatch`] for another schema version,
    /// [`RestoreError::Inconsistent`] when the lines break an invariant.
    pub fn restore(self) -> Result<Cart, RestoreError> {
        if self.version != CART_SCHEMA_VERSION {
            return Err(RestoreError::VersionMismatch {
                found: self.version,
                expected: CART_SCHEMA_VERSION,
            });
        }
        Ok(Cart::from_items(self.items)?)
    }

    /// Restore from an untyped JSON value (as read from a session store).
    ///
    /// The version tag is checked before the lines are parsed, so a future
    /// schema with a different line shape reports a version mismatch rather
    /// than a parse error.
    ///
    /// # Errors
    ///
    /// Any [`RestoreError`].
    pub fn restore_value(value: serde_json::Value) -> Result<Cart, RestoreError> {
        #[derive(Deserialize)]
        struct VersionOnly {
            version: u32,
        }

        let VersionOnly { version } = serde_json::from_value(value.clone())?;
        if version != CART_SCHEMA_VERSION {
            return Err(RestoreError::VersionMismatch {
                found: version,
                expected: CART_SCHEMA_VERSION,
            });
        }

        let envelope: Self = serde_json::from_value(value)?;
        envelope.restore()
    }
}
