//! Session-backed profile store.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use lunchbox_core::UserProfile;
use tower_sessions::Session;
use tracing::warn;

use super::{StoreError, session_from_parts};
use crate::error::AppError;
use crate::models::session_keys;

/// The signed-in student's profile, if any.
///
/// Replaced wholesale on login or session restore and cleared on logout.
/// No validation happens here; the record is whatever the auth service
/// returned.
pub struct ProfileStore {
    session: Session,
    profile: Option<UserProfile>,
}

impl ProfileStore {
    /// Load the profile from `session`. An unreadable record counts as none.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be read.
    pub async fn load(session: Session) -> Result<Self, StoreError> {
        let profile = match session.get::<UserProfile>(session_keys::PROFILE).await {
            Ok(profile) => profile,
            Err(tower_sessions::session::Error::SerdeJson(e)) => {
                warn!(error = %e, "Discarding unreadable stored profile");
                session.remove_value(session_keys::PROFILE).await?;
                None
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self { session, profile })
    }

    #[must_use]
    pub const fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    /// Replace the stored profile. `None` clears it.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be written.
    pub async fn set_profile(&mut self, profile: Option<UserProfile>) -> Result<(), StoreError> {
        match &profile {
            Some(p) => self.session.insert(session_keys::PROFILE, p).await?,
            None => {
                self.session.remove_value(session_keys::PROFILE).await?;
            }
        }
        self.profile = profile;
        Ok(())
    }

    /// Forget the profile (logout). Idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be written.
    pub async fn clear_profile(&mut self) -> Result<(), StoreError> {
        self.set_profile(None).await
    }
}

impl<S> FromRequestParts<S> for ProfileStore
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = session_from_parts(parts)?;
        Ok(Self::load(session).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use lunchbox_core::{CanteenId, Email, Gender, HostelId, Role, UserId};
    use tower_sessions::MemoryStore;

    use super::*;

    fn profile() -> UserProfile {
        UserProfile {
            id: UserId::new("u1"),
            full_name: "Asha Verma".to_string(),
            email: Email::parse("22bcs001@iiitdmj.ac.in").unwrap(),
            phone: "+919876543210".to_string(),
            hostel_id: HostelId::new("h1"),
            preferred_canteen_id: CanteenId::new("c1"),
            gender: Gender::Female,
            role: Role::Student,
        }
    }

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_set_then_reload() {
        let session = session();
        let mut store = ProfileStore::load(session.clone()).await.unwrap();
        assert!(store.profile().is_none());

        store.set_profile(Some(profile())).await.unwrap();
        let reloaded = ProfileStore::load(session).await.unwrap();
        assert_eq!(reloaded.profile(), Some(&profile()));
    }

    #[tokio::test]
    async fn test_set_none_then_clear_stays_none() {
        let session = session();
        let mut store = ProfileStore::load(session.clone()).await.unwrap();
        store.set_profile(Some(profile())).await.unwrap();

        store.set_profile(None).await.unwrap();
        store.clear_profile().await.unwrap();
        assert!(store.profile().is_none());
        assert!(ProfileStore::load(session).await.unwrap().profile().is_none());
    }

    #[tokio::test]
    async fn test_unreadable_profile_counts_as_none() {
        let session = session();
        session
            .insert(session_keys::PROFILE, serde_json::json!({ "id": 7 }))
            .await
            .unwrap();

        let store = ProfileStore::load(session.clone()).await.unwrap();
        assert!(store.profile().is_none());
        assert!(session.get_value(session_keys::PROFILE).await.unwrap().is_none());
    }
}
