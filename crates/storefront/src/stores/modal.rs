//! Login overlay visibility.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tower_sessions::Session;

use super::{StoreError, session_from_parts};
use crate::error::AppError;
use crate::models::session_keys;

/// Whether the login overlay is open for this visitor.
///
/// Every full page renders the overlay when the flag is set, so opening it
/// from one page keeps it open across a redirect.
pub struct LoginModal {
    session: Session,
    open: bool,
}

impl LoginModal {
    /// # Errors
    ///
    /// Returns an error if the session cannot be read.
    pub async fn load(session: Session) -> Result<Self, StoreError> {
        let open = session
            .get::<bool>(session_keys::LOGIN_MODAL_OPEN)
            .await?
            .unwrap_or(false);
        Ok(Self { session, open })
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.open
    }

    /// Show the overlay. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be written.
    pub async fn open(&mut self) -> Result<(), StoreError> {
        self.session.insert(session_keys::LOGIN_MODAL_OPEN, true).await?;
        self.open = true;
        Ok(())
    }

    /// Hide the overlay. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be written.
    pub async fn close(&mut self) -> Result<(), StoreError> {
        self.session
            .remove_value(session_keys::LOGIN_MODAL_OPEN)
            .await?;
        self.open = false;
        Ok(())
    }
}

impl<S> FromRequestParts<S> for LoginModal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = session_from_parts(parts)?;
        Ok(Self::load(session).await?)
    }
}
