//! Request and response shapes of the hosted auth service.

use chrono::{DateTime, Utc};
use lunchbox_core::UserId;
use serde::{Deserialize, Serialize};

/// The authenticated user as returned by `/auth/v1/user`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
}

/// Access/refresh token pair kept in the visitor's session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp (seconds) after which the access token is rejected.
    pub expires_at: i64,
}

impl AuthTokens {
    /// Seconds of slack before expiry at which a token is already treated as expired.
    const EXPIRY_MARGIN_SECS: i64 = 30;

    /// Whether the access token should be refreshed before use.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() + Self::EXPIRY_MARGIN_SECS >= self.expires_at
    }
}

/// A signed-in session: tokens plus the user they belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub tokens: AuthTokens,
    pub user: AuthUser,
}

/// Result of a sign-up.
///
/// `session` is `None` when the project requires email confirmation, which
/// is the normal case for student accounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUpOutcome {
    pub user: AuthUser,
    pub session: Option<AuthSession>,
}

/// Body of a `/auth/v1/token` response.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

impl TokenResponse {
    /// Tokens default to a one hour lifetime when the service omits both fields.
    pub(crate) fn into_session(self, now: DateTime<Utc>) -> AuthSession {
        let expires_at = self
            .expires_at
            .unwrap_or_else(|| now.timestamp() + self.expires_in.unwrap_or(3_600));
        AuthSession {
            tokens: AuthTokens {
                access_token: self.access_token,
                refresh_token: self.refresh_token,
                expires_at,
            },
            user: self.user,
        }
    }
}

/// Body of a `/auth/v1/signup` response: a full session when auto-confirm
/// is on, the bare user otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum SignUpResponse {
    Session(TokenResponse),
    User(AuthUser),
}

/// Error body returned by the auth service or the REST layer.
///
/// Different endpoints use different field names for the message.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ErrorBody {
    pub(crate) fn into_message(self) -> Option<String> {
        self.msg
            .or(self.message)
            .or(self.error_description)
            .or(self.error)
            .filter(|m| !m.trim().is_empty())
    }
}
