//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::config::StorefrontConfig;
use crate::recipes::{InFlight, RecipeSource};
use crate::supabase::AuthBackend;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. The external services sit behind trait
/// objects so tests can run the router against in-memory fakes.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: SqlitePool,
    auth: Arc<dyn AuthBackend>,
    recipes: Arc<dyn RecipeSource>,
    feed_in_flight: InFlight,
    boot_id: Uuid,
}

impl AppState {
    /// Create a new application state with a fresh boot id.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `pool` - `SQLite` pool backing the session store
    /// * `auth` - Hosted auth/database service
    /// * `recipes` - Random-recipe service for the landing page feed
    #[must_use]
    pub fn new(
        config: StorefrontConfig,
        pool: SqlitePool,
        auth: Arc<dyn AuthBackend>,
        recipes: Arc<dyn RecipeSource>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                auth,
                recipes,
                feed_in_flight: InFlight::new(),
                boot_id: Uuid::new_v4(),
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the session database pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.inner.pool
    }

    /// The hosted auth/database service.
    #[must_use]
    pub fn auth(&self) -> &dyn AuthBackend {
        self.inner.auth.as_ref()
    }

    /// The recipe service.
    #[must_use]
    pub fn recipes(&self) -> &dyn RecipeSource {
        self.inner.recipes.as_ref()
    }

    /// Feed cursors with a batch in flight.
    #[must_use]
    pub fn feed_in_flight(&self) -> &InFlight {
        &self.inner.feed_in_flight
    }

    /// Identifies this server process. Sessions initialized by an earlier
    /// process carry a different id and are initialized again.
    #[must_use]
    pub fn boot_id(&self) -> Uuid {
        self.inner.boot_id
    }
}
