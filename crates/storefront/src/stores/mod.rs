//! Per-visitor state backed by the session.
//!
//! Each store is loaded from the visitor's session at the start of a request
//! (usually through its extractor), mutated by one command, and written back
//! before the command returns. Nothing is shared between visitors.

pub mod cart;
pub mod modal;
pub mod profile;

pub use cart::CartStore;
pub use modal::LoginModal;
pub use profile::ProfileStore;

use axum::http::request::Parts;
use lunchbox_core::CartError;
use thiserror::Error;
use tower_sessions::Session;

/// Errors raised by store commands.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The cart refused the command.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Reading or writing the session failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// The session layer is not installed on this route.
    #[error("No session on request")]
    MissingSession,
}

/// Get the session placed in the request extensions by `SessionManagerLayer`.
pub(crate) fn session_from_parts(parts: &Parts) -> Result<Session, StoreError> {
    parts
        .extensions
        .get::<Session>()
        .cloned()
        .ok_or(StoreError::MissingSession)
}
