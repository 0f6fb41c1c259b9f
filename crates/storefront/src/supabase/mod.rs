//! Hosted auth and database service (Supabase-style REST).
//!
//! # Architecture
//!
//! - The service is the source of truth for users, profiles, hostels and
//!   canteens. Nothing is synced locally.
//! - Auth goes through the GoTrue endpoints under `/auth/v1`, table reads and
//!   RPC calls through the PostgREST endpoints under `/rest/v1`.
//! - The hostel list is cached in memory via `moka` (5 minute TTL).
//!
//! Handlers only see the [`AuthBackend`] trait, so tests can swap in an
//! in-memory fake.

mod client;
pub mod types;

pub use client::SupabaseClient;
pub use types::{AuthSession, AuthTokens, AuthUser, SignUpOutcome};

use async_trait::async_trait;
use lunchbox_core::{Canteen, Email, Gender, Hostel, HostelId, Registration, UserId, UserProfile};
use secrecy::SecretString;
use thiserror::Error;

/// Errors that can occur when talking to the hosted service.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The access or refresh token was rejected.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The requested row does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The service answered with an error.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The response body could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl BackendError {
    /// Message suitable for showing to the visitor.
    ///
    /// Service-provided messages are passed through; transport and parse
    /// failures get a generic one.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } | Self::Unauthorized(message) => message.clone(),
            Self::NotFound(_) => "We couldn't find your profile. Please contact support.".to_string(),
            Self::Http(_) => "Could not reach the server. Please try again.".to_string(),
            Self::Parse(_) => "Unexpected response from the server.".to_string(),
        }
    }

    /// Whether the stored tokens should be dropped.
    #[must_use]
    pub const fn is_rejected_token(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

/// Operations the storefront needs from the hosted service.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Sign in with email and password.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<AuthSession, BackendError>;

    /// Create an account, attaching the registration as user metadata.
    async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
        registration: &Registration,
    ) -> Result<SignUpOutcome, BackendError>;

    /// Revoke the session behind `access_token`.
    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError>;

    /// The user `access_token` belongs to.
    async fn get_user(&self, access_token: &str) -> Result<AuthUser, BackendError>;

    /// Exchange a refresh token for a fresh session.
    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, BackendError>;

    /// Fetch the profile row of `user_id`.
    async fn fetch_profile(
        &self,
        access_token: &str,
        user_id: &UserId,
    ) -> Result<UserProfile, BackendError>;

    /// Insert a profile row. Without a token the anon key is used.
    async fn insert_profile(
        &self,
        access_token: Option<&str>,
        profile: &UserProfile,
    ) -> Result<(), BackendError>;

    /// All hostels ordered by name.
    async fn list_hostels(&self) -> Result<Vec<Hostel>, BackendError>;

    /// Canteens whose name contains `query`, restricted to those serving `hostel_id`.
    async fn search_canteens(
        &self,
        hostel_id: Option<&HostelId>,
        query: &str,
    ) -> Result<Vec<Canteen>, BackendError>;

    /// Canteens a student of `gender` living in `hostel_id` may pick.
    async fn available_canteens(
        &self,
        hostel_id: &HostelId,
        gender: Gender,
    ) -> Result<Vec<Canteen>, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_passes_service_text_through() {
        let err = BackendError::Api {
            status: 400,
            message: "Invalid login credentials".to_string(),
        };
        assert_eq!(err.user_message(), "Invalid login credentials");
        assert!(!err.is_rejected_token());
    }

    #[test]
    fn test_rejected_token() {
        let err = BackendError::Unauthorized("JWT expired".to_string());
        assert!(err.is_rejected_token());
        assert_eq!(err.to_string(), "Unauthorized: JWT expired");
    }
}
