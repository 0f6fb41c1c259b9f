//! Authentication extractors and token helpers.
//!
//! "Signed in" means the session holds a [`UserProfile`] (written by login or
//! by the session initializer). The auth service tokens are kept alongside it
//! so the session can be restored after a restart and revoked on logout.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use lunchbox_core::UserProfile;
use tower_sessions::Session;

use crate::models::session_keys;
use crate::supabase::AuthTokens;

/// Extractor that requires a signed-in student.
///
/// Guests are redirected to the login page.
///
/// ```rust,ignore
/// async fn order(RequireProfile(profile): RequireProfile) -> impl IntoResponse {
///     format!("Hello, {}!", profile.first_name())
/// }
/// ```
pub struct RequireProfile(pub UserProfile);

/// Why [`RequireProfile`] turned a request away.
pub enum AuthRejection {
    /// Redirect to the login page (HTML requests).
    RedirectToLogin,
    /// No session layer on this route.
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/auth/login").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireProfile
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::Unauthorized)?;

        session
            .get::<UserProfile>(session_keys::PROFILE)
            .await
            .ok()
            .flatten()
            .map(Self)
            .ok_or(AuthRejection::RedirectToLogin)
    }
}

/// Read the stored auth tokens, if any. Unreadable tokens count as none.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn auth_tokens(
    session: &Session,
) -> Result<Option<AuthTokens>, tower_sessions::session::Error> {
    match session.get::<AuthTokens>(session_keys::AUTH_TOKENS).await {
        Err(tower_sessions::session::Error::SerdeJson(_)) => Ok(None),
        other => other,
    }
}

/// Store the auth tokens in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_auth_tokens(
    session: &Session,
    tokens: &AuthTokens,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::AUTH_TOKENS, tokens).await
}

/// Drop the auth tokens from the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_auth_tokens(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove_value(session_keys::AUTH_TOKENS).await?;
    Ok(())
}
