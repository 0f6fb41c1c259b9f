//! Core types for LunchBox.
//!
//! Type-safe wrappers for the domain concepts shared across crates.

pub mod campus;
pub mod email;
pub mod id;
pub mod price;

pub use campus::{Canteen, Gender, Hostel, Role, UnknownGender, hostels_visible_to};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::{Price, RUPEE_SYMBOL};
