//! Session initializer.
//!
//! Restores the signed-in profile once per server boot for each visitor
//! session. The session remembers the boot id of the process that last
//! initialized it; when that differs from the running process, the stored
//! auth tokens are checked against the auth service and the profile is
//! fetched again. Failures leave the visitor signed out and never fail the
//! request.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use lunchbox_core::UserProfile;
use tower_sessions::Session;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::auth::{auth_tokens, clear_auth_tokens, set_auth_tokens};
use crate::error::set_sentry_user;
use crate::models::session_keys;
use crate::state::AppState;
use crate::stores::{ProfileStore, StoreError};
use crate::supabase::{AuthBackend, AuthTokens, BackendError};

/// How a session came out of initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// Already initialized by this process.
    Current,
    /// Brand-new session; nothing to restore yet.
    Fresh,
    /// No stored tokens; profile cleared.
    SignedOut,
    /// Tokens accepted; profile loaded.
    Restored,
    /// Restore failed; profile cleared.
    Failed,
}

/// Middleware running [`initialize_session`] before the handler.
pub async fn session_init_middleware(
    State(state): State<AppState>,
    session: Session,
    request: Request,
    next: Next,
) -> Response {
    if let Err(e) = initialize_session(&state, &session).await {
        warn!(error = %e, "Session initialization failed");
    }
    next.run(request).await
}

/// Initialize `session` for the running process if it has not been already.
///
/// # Errors
///
/// Returns an error only if the session store fails. Auth service failures
/// are logged and reported as [`InitOutcome::Failed`].
#[instrument(skip_all)]
pub async fn initialize_session(
    state: &AppState,
    session: &Session,
) -> Result<InitOutcome, StoreError> {
    // Writing the boot id would persist a session for every anonymous hit
    if session.id().is_none() {
        return Ok(InitOutcome::Fresh);
    }

    if session.get::<Uuid>(session_keys::BOOT_ID).await.ok().flatten() == Some(state.boot_id()) {
        return Ok(InitOutcome::Current);
    }

    let mut profiles = ProfileStore::load(session.clone()).await?;

    let outcome = match auth_tokens(session).await? {
        None => {
            profiles.clear_profile().await?;
            InitOutcome::SignedOut
        }
        Some(tokens) => match restore_profile(state.auth(), tokens.clone()).await {
            Ok((profile, refreshed)) => {
                if refreshed != tokens {
                    set_auth_tokens(session, &refreshed).await?;
                }
                set_sentry_user(&profile.id, Some(profile.email.as_str()));
                debug!(user_id = %profile.id, "Restored profile");
                profiles.set_profile(Some(profile)).await?;
                InitOutcome::Restored
            }
            Err(e) => {
                warn!(error = %e, "Could not restore signed-in profile");
                if e.is_rejected_token() {
                    clear_auth_tokens(session).await?;
                }
                profiles.clear_profile().await?;
                InitOutcome::Failed
            }
        },
    };

    mark_initialized(state, session).await?;
    Ok(outcome)
}

/// Record that `session` is up to date with the running process.
///
/// Login calls this after populating the profile itself.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
pub async fn mark_initialized(
    state: &AppState,
    session: &Session,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::BOOT_ID, state.boot_id()).await
}

/// Check `tokens` with the auth service, refreshing them first when the
/// access token has expired, and fetch the profile row.
async fn restore_profile(
    auth: &dyn AuthBackend,
    tokens: AuthTokens,
) -> Result<(UserProfile, AuthTokens), BackendError> {
    let tokens = if tokens.is_expired(Utc::now()) {
        debug!("Access token expired, refreshing");
        auth.refresh_session(&tokens.refresh_token).await?.tokens
    } else {
        tokens
    };

    let user = auth.get_user(&tokens.access_token).await?;
    let profile = auth.fetch_profile(&tokens.access_token, &user.id).await?;
    Ok((profile, tokens))
}
