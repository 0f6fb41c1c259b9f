//! View models and session layout for the storefront.

pub mod offer;
pub mod session;

pub use offer::{OFFERS, Offer, random_offer};
pub use session::keys as session_keys;
