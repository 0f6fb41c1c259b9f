//! Canteen search and canteen pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use lunchbox_core::{Canteen, Hostel, HostelId};
use serde::Deserialize;
use tracing::instrument;

use super::context::PageContext;
use crate::filters;
use crate::state::AppState;

/// Search bar query.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub hostel_id: Option<String>,
    pub q: Option<String>,
}

/// Search results page template.
#[derive(Template, WebTemplate)]
#[template(path = "canteens/index.html")]
pub struct CanteenIndexTemplate {
    pub page: PageContext,
    pub query: String,
    pub hostel_id: String,
    pub hostels: Vec<Hostel>,
    pub canteens: Vec<Canteen>,
    pub error: Option<String>,
}

/// Canteen page template.
#[derive(Template, WebTemplate)]
#[template(path = "canteens/show.html")]
pub struct CanteenShowTemplate {
    pub page: PageContext,
    pub id: String,
}

/// Canteens whose name contains `q` and that serve the chosen hostel.
#[instrument(skip(state, page))]
pub async fn index(
    State(state): State<AppState>,
    page: PageContext,
    Query(query): Query<SearchQuery>,
) -> impl IntoResponse {
    let q = query.q.unwrap_or_default().trim().to_string();
    let hostel_id = query.hostel_id.unwrap_or_default().trim().to_string();
    let hostel = (!hostel_id.is_empty()).then(|| HostelId::new(hostel_id.as_str()));

    let (canteens, error) = match state.auth().search_canteens(hostel.as_ref(), &q).await {
        Ok(canteens) => (canteens, None),
        Err(e) => {
            tracing::warn!(error = %e, "Canteen search failed");
            (Vec::new(), Some(e.user_message()))
        }
    };

    let hostels = state.auth().list_hostels().await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load hostels for the search bar");
        Vec::new()
    });

    CanteenIndexTemplate {
        page,
        query: q,
        hostel_id,
        hostels,
        canteens,
        error,
    }
}

/// Canteen page. Menus are not served yet.
pub async fn show(page: PageContext, Path(id): Path<String>) -> impl IntoResponse {
    CanteenShowTemplate { page, id }
}
