//! Recommendation feed (HTMX infinite scroll).

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::models::session_keys;
use crate::recipes::{FeedCursor, Meal, load_batch};
use crate::state::AppState;

/// Longest instructions excerpt shown on a card.
const EXCERPT_CHARS: usize = 160;

/// A meal as shown on a feed card.
pub struct MealCard {
    pub name: String,
    pub thumbnail_url: Option<String>,
    pub category: Option<String>,
    pub area: Option<String>,
    pub tags: Vec<String>,
    pub excerpt: Option<String>,
    pub youtube_url: Option<String>,
}

impl From<Meal> for MealCard {
    fn from(meal: Meal) -> Self {
        let tags = meal.tag_list().into_iter().map(String::from).collect();
        Self {
            excerpt: meal.instructions.as_deref().map(excerpt),
            name: meal.name,
            thumbnail_url: meal.thumbnail_url,
            category: meal.category,
            area: meal.area,
            tags,
            youtube_url: meal.youtube_url.filter(|u| !u.is_empty()),
        }
    }
}

fn excerpt(text: &str) -> String {
    let text = text.trim();
    match text.char_indices().nth(EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}…", text[..cut].trim_end()),
        None => text.to_string(),
    }
}

/// One batch of feed cards, followed by the next scroll trigger.
#[derive(Template, WebTemplate)]
#[template(path = "partials/recommendations.html")]
pub struct RecommendationsTemplate {
    pub meals: Vec<MealCard>,
    pub error: Option<String>,
    pub has_more: bool,
    pub loaded: usize,
}

/// Load the next batch of the visitor's feed.
///
/// A trigger arriving while the previous batch is still loading gets an
/// empty `204` and nothing is queued. Once `MAX_MEALS` have been shown the
/// fragment ends the feed.
#[instrument(skip_all)]
pub async fn more(State(state): State<AppState>, session: Session) -> Result<Response> {
    let cursor = session
        .get::<FeedCursor>(session_keys::FEED_CURSOR)
        .await
        .ok()
        .flatten()
        .unwrap_or_default();

    if !cursor.has_more() {
        return Ok(RecommendationsTemplate {
            meals: Vec::new(),
            error: None,
            has_more: false,
            loaded: cursor.loaded,
        }
        .into_response());
    }

    let Some(_guard) = state.feed_in_flight().try_acquire(cursor.key) else {
        tracing::debug!(key = %cursor.key, "Feed batch already in flight");
        return Ok(StatusCode::NO_CONTENT.into_response());
    };

    let batch = load_batch(state.recipes(), cursor).await;
    let has_more = batch.has_more();
    let loaded = batch.loaded();
    if let Some(next) = batch.cursor {
        session.insert(session_keys::FEED_CURSOR, next).await?;
    }

    Ok(RecommendationsTemplate {
        meals: batch.meals.into_iter().map(MealCard::from).collect(),
        error: batch.error,
        has_more,
        loaded,
    }
    .into_response())
}
