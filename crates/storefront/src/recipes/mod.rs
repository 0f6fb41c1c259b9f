//! Recipe recommendations for the landing page.
//!
//! Meals come from a public random-recipe service (TheMealDB by default),
//! one per request. The feed fetches them in small concurrent batches up to a
//! per-visit cap; see [`feed`].

mod client;
pub mod feed;

pub use client::MealDbClient;
pub use feed::{
    FeedBatch, FeedCursor, InFlight, InFlightGuard, MAX_MEALS, MEALS_PER_LOAD, load_batch,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when fetching a recipe.
#[derive(Debug, Error)]
pub enum RecipeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("HTTP error! status: {0}")]
    Status(u16),

    /// The response body could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// A recipe as served by the recipe service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meal {
    #[serde(rename = "idMeal")]
    pub id: String,
    #[serde(rename = "strMeal")]
    pub name: String,
    #[serde(rename = "strCategory", default)]
    pub category: Option<String>,
    #[serde(rename = "strArea", default)]
    pub area: Option<String>,
    #[serde(rename = "strInstructions", default)]
    pub instructions: Option<String>,
    #[serde(rename = "strMealThumb", default)]
    pub thumbnail_url: Option<String>,
    #[serde(rename = "strTags", default)]
    pub tags: Option<String>,
    #[serde(rename = "strYoutube", default)]
    pub youtube_url: Option<String>,
}

impl Meal {
    /// Comma-separated tags split into a list, blanks dropped.
    #[must_use]
    pub fn tag_list(&self) -> Vec<&str> {
        self.tags
            .as_deref()
            .map(|tags| {
                tags.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Something that hands out random meals.
#[async_trait]
pub trait RecipeSource: Send + Sync {
    /// One random meal, or `None` when the service had nothing to return.
    async fn random_meal(&self) -> Result<Option<Meal>, RecipeError>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_meal_from_service_payload() {
        let meal: Meal = serde_json::from_str(
            r#"{
                "idMeal": "52772",
                "strMeal": "Teriyaki Chicken Casserole",
                "strCategory": "Chicken",
                "strArea": "Japanese",
                "strInstructions": "Preheat oven to 350F.",
                "strMealThumb": "https://www.themealdb.com/images/media/meals/wvpsxx1468256321.jpg",
                "strTags": "Meat, Casserole,",
                "strYoutube": null,
                "strIngredient1": "soy sauce"
            }"#,
        )
        .unwrap();

        assert_eq!(meal.id, "52772");
        assert_eq!(meal.area.as_deref(), Some("Japanese"));
        assert_eq!(meal.tag_list(), ["Meat", "Casserole"]);
        assert!(meal.youtube_url.is_none());
    }

    #[test]
    fn test_status_error_message() {
        assert_eq!(RecipeError::Status(503).to_string(), "HTTP error! status: 503");
    }
}
