//! Shared data every full page renders: the header, the cart badge and the
//! login overlay.

use axum::extract::{FromRequestParts, OriginalUri};
use axum::http::request::Parts;
use lunchbox_core::UserProfile;

use crate::error::AppError;
use crate::middleware::CspNonce;
use crate::models::session_keys;
use crate::stores::{CartStore, LoginModal, session_from_parts};

/// Query parameter carrying a login failure back to the page that opened
/// the overlay.
pub const LOGIN_ERROR_PARAM: &str = "login_error";

/// Message for a login error code.
#[must_use]
pub fn login_error_message(code: &str) -> Option<&'static str> {
    match code {
        "missing" => Some("Email and password are required."),
        "credentials" => Some("Invalid email or password."),
        "profile" => Some("Signed in, but your profile could not be loaded."),
        "session" => Some("Could not start your session. Please try again."),
        _ => None,
    }
}

/// `candidate` if it is a path on this site, otherwise `/`.
///
/// Rejects absolute and protocol-relative URLs so redirects cannot leave
/// the site.
#[must_use]
pub fn local_path(candidate: Option<&str>) -> &str {
    match candidate.map(str::trim) {
        Some(path)
            if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') =>
        {
            path
        }
        _ => "/",
    }
}

/// Per-request page chrome.
pub struct PageContext {
    pub profile: Option<UserProfile>,
    pub login_modal_open: bool,
    pub login_error: Option<&'static str>,
    pub cart_count: u32,
    pub nonce: String,
    /// Path of the page being rendered, so the overlay can come back to it.
    pub current_path: String,
}

impl PageContext {
    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        self.profile.is_some()
    }

    /// First name for the header greeting.
    #[must_use]
    pub fn greeting_name(&self) -> &str {
        self.profile.as_ref().map_or("", UserProfile::first_name)
    }
}

impl<S> FromRequestParts<S> for PageContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CspNonce(nonce) = CspNonce::from_request_parts(parts, state)
            .await
            .unwrap_or_else(|never| match never {});
        let session = session_from_parts(parts)?;

        let profile = session
            .get::<UserProfile>(session_keys::PROFILE)
            .await
            .ok()
            .flatten();
        let login_modal_open = LoginModal::load(session.clone()).await?.is_open();
        let cart_count = CartStore::load(session).await?.cart().item_count();

        // Nested routers strip their prefix from `parts.uri`
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map_or_else(|| parts.uri.clone(), |original| original.0.clone());

        let login_error = uri.query().and_then(|query| {
            url::form_urlencoded::parse(query.as_bytes())
                .find(|(key, _)| key == LOGIN_ERROR_PARAM)
                .and_then(|(_, code)| login_error_message(&code))
        });

        Ok(Self {
            profile,
            login_modal_open,
            login_error,
            cart_count,
            nonce,
            current_path: uri.path().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_error_codes() {
        assert_eq!(
            login_error_message("credentials"),
            Some("Invalid email or password.")
        );
        assert!(login_error_message("missing").is_some());
        assert!(login_error_message("<script>").is_none());
    }

    #[test]
    fn test_local_path_rejects_other_sites() {
        assert_eq!(local_path(Some("/cart")), "/cart");
        assert_eq!(local_path(Some("/canteens?q=night")), "/canteens?q=night");
        assert_eq!(local_path(Some("//evil.example/x")), "/");
        assert_eq!(local_path(Some("https://evil.example/")), "/");
        assert_eq!(local_path(Some("/\\evil.example")), "/");
        assert_eq!(local_path(None), "/");
    }
}
