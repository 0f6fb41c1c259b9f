//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`. Server-side failures are
//! captured to Sentry before the response is built; the client only ever
//! sees a short, safe message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use lunchbox_core::CartError;
use thiserror::Error;

use crate::stores::StoreError;
use crate::supabase::BackendError;

/// Shown when an item from a second canteen is added to the cart.
pub const CONFLICTING_CANTEEN_MESSAGE: &str = "You can only order from one canteen at a time.";

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// The hosted auth/database service failed or refused the call.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// The cart refused a command.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Reading or writing the visitor's session failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Cart(e) => Self::Cart(e),
            StoreError::Session(e) => Self::Session(e),
            StoreError::MissingSession => Self::Internal("No session on request".to_string()),
        }
    }
}

impl AppError {
    /// Whether this error is our fault (or the upstream service's) rather
    /// than the client's.
    const fn is_server_error(&self) -> bool {
        match self {
            Self::Session(_) | Self::Internal(_) => true,
            Self::Backend(e) => !matches!(
                e,
                BackendError::Unauthorized(_) | BackendError::NotFound(_)
            ),
            _ => false,
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Backend(err) => match err {
                BackendError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                BackendError::NotFound(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::Cart(err) => match err {
                CartError::ConflictingCanteen { .. } => StatusCode::CONFLICT,
                CartError::InvalidQuantity(_)
                | CartError::InvalidPrice(_)
                | CartError::DuplicateItem(_)
                | CartError::AmountTooLarge => StatusCode::BAD_REQUEST,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Message safe to show to the visitor.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Session(_) | Self::Internal(_) => "Internal server error".to_string(),
            Self::Backend(err) => err.user_message(),
            Self::Cart(err) => match err {
                CartError::ConflictingCanteen { .. } => CONFLICTING_CANTEEN_MESSAGE.to_string(),
                CartError::InvalidQuantity(_) => "Quantity must be at least 1.".to_string(),
                CartError::InvalidPrice(_) => "That item has an invalid price.".to_string(),
                CartError::DuplicateItem(_) => "That item is already in your cart.".to_string(),
                CartError::AmountTooLarge => "That order is too large.".to_string(),
            },
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (self.status(), self.user_message()).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Call this after a successful login or session restore.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context (logout).
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for a visitor action.
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item", Some(&[("item_id", "dosa")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
