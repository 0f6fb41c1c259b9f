//! LunchBox Core - Shared domain types and rules.
//!
//! Used by the `storefront` crate and its integration tests.
//!
//! # Architecture
//!
//! The core crate contains only types and rules - no I/O, no HTTP clients,
//! no session handling. Anything here can be unit-tested without a runtime.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, prices and campus entities
//! - [`cart`] - The single-canteen cart and its persisted form
//! - [`profile`] - The signed-in student's profile record
//! - [`registration`] - Sign-up form validation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod profile;
pub mod registration;
pub mod types;

pub use cart::{Cart, CartError, CartItem, MenuItem, PersistedCart};
pub use profile::UserProfile;
pub use registration::{Registration, RegistrationError, RegistrationForm};
pub use types::*;
