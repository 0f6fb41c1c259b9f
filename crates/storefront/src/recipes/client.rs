//! HTTP client for TheMealDB-compatible recipe services.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;
use url::Url;

use super::{Meal, RecipeError, RecipeSource};

/// Client for a TheMealDB-compatible API.
#[derive(Clone)]
pub struct MealDbClient {
    client: reqwest::Client,
    random_url: String,
}

#[derive(Deserialize)]
struct MealsResponse {
    #[serde(default)]
    meals: Option<Vec<Meal>>,
}

impl MealDbClient {
    /// Create a new client rooted at `base_url` (e.g. `https://www.themealdb.com/api/json/v1/1`).
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(base_url: &Url, timeout: Duration) -> Result<Self, RecipeError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            random_url: format!("{}/random.php", base_url.as_str().trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl RecipeSource for MealDbClient {
    #[instrument(skip(self))]
    async fn random_meal(&self) -> Result<Option<Meal>, RecipeError> {
        let response = self.client.get(&self.random_url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RecipeError::Status(status.as_u16()));
        }

        let body: MealsResponse = response
            .json()
            .await
            .map_err(|e| RecipeError::Parse(e.to_string()))?;
        Ok(body.meals.and_then(|meals| meals.into_iter().next()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_random_url() {
        let base = Url::parse("https://www.themealdb.com/api/json/v1/1/").unwrap();
        let client = MealDbClient::new(&base, Duration::from_secs(5)).unwrap();
        assert_eq!(
            client.random_url,
            "https://www.themealdb.com/api/json/v1/1/random.php"
        );
    }

    #[test]
    fn test_null_meals_is_none() {
        let body: MealsResponse = serde_json::from_str(r#"{"meals":null}"#).unwrap();
        assert!(body.meals.is_none());
    }
}
