//! Food Database Tools
//!
//! Search the external food database and fetch per-100g profiles.

use serde::Serialize;

use crate::fooddb::{FoodDatabase, FoodDbError, FoodSearchResult};
use crate::models::NutritionProfile;

#[derive(Debug, Serialize)]
pub struct SearchFoodResponse {
    pub query: String,
    pub results: Vec<FoodSearchResult>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct FoodProfileResponse {
    pub id: u64,
    pub per_100g: NutritionProfile,
}

/// Search foods by name
pub async fn search_food(
    food_db: &dyn FoodDatabase,
    query: &str,
    limit: usize,
) -> Result<SearchFoodResponse, String> {
    let limit = limit.clamp(1, 50);

    let mut results = food_db.search_food(query).await.map_err(|e| match e {
        FoodDbError::EmptyQuery => e.to_string(),
        other => format!("Food search failed: {}", other),
    })?;
    results.truncate(limit);

    Ok(SearchFoodResponse {
        query: query.trim().to_string(),
        total: results.len(),
        results,
    })
}

/// Per-100g profile of one food
pub async fn get_food_profile(food_db: &dyn FoodDatabase, id: u64) -> Result<FoodProfileResponse, String> {
    let profile = food_db
        .get_profile(id)
        .await
        .map_err(|e| format!("Failed to get food profile: {}", e))?;

    Ok(FoodProfileResponse { id, per_100g: profile })
}
