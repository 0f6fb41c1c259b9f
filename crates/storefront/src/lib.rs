//! LunchBox Storefront library.
//!
//! The campus canteen storefront as a library, so the router can be driven
//! in-process by tests against fake backends.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod recipes;
pub mod routes;
pub mod state;
pub mod stores;
pub mod supabase;

pub use routes::{RouterOptions, app};
