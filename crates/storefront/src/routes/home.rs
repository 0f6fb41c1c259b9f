//! Landing page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use lunchbox_core::Hostel;
use tower_sessions::Session;
use tracing::instrument;

use super::context::PageContext;
use crate::error::Result;
use crate::filters;
use crate::models::{Offer, random_offer, session_keys};
use crate::recipes::FeedCursor;
use crate::state::AppState;

/// Landing page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub page: PageContext,
    pub offer: &'static Offer,
    pub hostels: Vec<Hostel>,
}

/// Display the landing page.
///
/// Each render starts a new recommendation feed for the visitor.
#[instrument(skip_all)]
pub async fn home(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
) -> Result<impl IntoResponse> {
    let hostels = state.auth().list_hostels().await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load hostels for the search bar");
        Vec::new()
    });

    session
        .insert(session_keys::FEED_CURSOR, FeedCursor::new())
        .await?;

    Ok(HomeTemplate {
        page,
        offer: random_offer(),
        hostels,
    })
}
