//! Session middleware configuration.
//!
//! Visitor sessions live in `SQLite` via `tower-sessions-sqlx-store`. Tests
//! pass a `MemoryStore` instead; the layer settings are the same either way.

use sqlx::SqlitePool;
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};
use tower_sessions_sqlx_store::SqliteStore;

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "lb_session";

/// Session expiry time in seconds (30 days of inactivity).
const SESSION_EXPIRY_SECONDS: i64 = 30 * 24 * 60 * 60;

/// Open the `SQLite` session store, creating its table if needed.
///
/// # Errors
///
/// Returns an error if the migration fails.
pub async fn sqlite_session_store(pool: SqlitePool) -> Result<SqliteStore, sqlx::Error> {
    let store = SqliteStore::new(pool);
    store.migrate().await?;
    Ok(store)
}

/// Create the session layer over `store`.
///
/// Cookies are `HttpOnly`, `SameSite=Lax`, and `Secure` when the public base
/// URL is https.
#[must_use]
pub fn create_session_layer<S>(store: S, config: &StorefrontConfig) -> SessionManagerLayer<S>
where
    S: SessionStore + Clone,
{
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.secure_cookies())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sqlite_store_migrates_in_memory() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        let store = sqlite_session_store(pool.clone()).await;
        assert!(store.is_ok());

        let tables: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table'")
                .fetch_all(&pool)
                .await
                .unwrap();
        assert!(!tables.is_empty());
    }
}
