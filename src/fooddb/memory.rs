//! In-process food database
//!
//! Backs offline mode and tests. Ships with a small set of reference foods
//! (USDA SR Legacy values) so a server without network access still resolves
//! common ingredients.

use std::collections::BTreeMap;

use async_trait::async_trait;

use super::{FoodDatabase, FoodDbError, FoodSearchResult};
use crate::models::NutritionProfile;

#[derive(Debug, Clone)]
struct MemoryFood {
    name: String,
    data_type: String,
    profile: NutritionProfile,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryFoodDatabase {
    foods: BTreeMap<u64, MemoryFood>,
}

impl MemoryFoodDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Database preloaded with common kitchen staples
    pub fn with_reference_foods() -> Self {
        Self::new()
            .with_food(
                171477,
                "Chicken, broilers or fryers, breast, meat only, cooked, roasted",
                NutritionProfile::macros(165.0, 31.0, 0.0, 3.6),
            )
            .with_food(
                169756,
                "Rice, white, long-grain, regular, enriched, cooked",
                NutritionProfile::macros(130.0, 2.7, 28.0, 0.3).with_fiber(0.4),
            )
            .with_food(
                170379,
                "Broccoli, raw",
                NutritionProfile::macros(34.0, 2.8, 7.0, 0.4)
                    .with_fiber(2.6)
                    .with_sugar(1.7),
            )
            .with_food(
                171413,
                "Oil, olive, salad or cooking",
                NutritionProfile::macros(884.0, 0.0, 0.0, 100.0),
            )
            .with_food(
                170457,
                "Tomatoes, red, ripe, raw, year round average",
                NutritionProfile::macros(18.0, 0.9, 3.9, 0.2)
                    .with_fiber(1.2)
                    .with_sugar(2.6),
            )
            .with_food(
                171287,
                "Egg, whole, raw, fresh",
                NutritionProfile::macros(143.0, 12.6, 0.7, 9.5).with_sugar(0.4),
            )
            .with_food(
                173410,
                "Butter, salted",
                NutritionProfile::macros(717.0, 0.9, 0.1, 81.1).with_sugar(0.1),
            )
    }

    pub fn with_food(mut self, id: u64, name: &str, profile: NutritionProfile) -> Self {
        self.insert(id, name, profile);
        self
    }

    pub fn insert(&mut self, id: u64, name: &str, profile: NutritionProfile) {
        self.foods.insert(
            id,
            MemoryFood {
                name: name.to_string(),
                data_type: "SR Legacy".to_string(),
                profile,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.foods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.foods.is_empty()
    }
}

#[async_trait]
impl FoodDatabase for MemoryFoodDatabase {
    async fn search_food(&self, query: &str) -> Result<Vec<FoodSearchResult>, FoodDbError> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Err(FoodDbError::EmptyQuery);
        }

        Ok(self
            .foods
            .iter()
            .filter(|(_, food)| food.name.to_lowercase().contains(&query))
            .map(|(id, food)| FoodSearchResult {
                id: *id,
                name: food.name.clone(),
                brand: None,
                data_type: food.data_type.clone(),
            })
            .collect())
    }

    async fn get_profile(&self, id: u64) -> Result<NutritionProfile, FoodDbError> {
        self.foods
            .get(&id)
            .map(|food| food.profile)
            .ok_or(FoodDbError::NotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let db = MemoryFoodDatabase::with_reference_foods();
        let results = db.search_food("  CHICKEN ").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 171477);

        assert!(db.search_food("unobtainium").await.unwrap().is_empty());
        assert!(matches!(db.search_food("").await, Err(FoodDbError::EmptyQuery)));
    }

    #[tokio::test]
    async fn test_get_profile() {
        let db = MemoryFoodDatabase::new().with_food(1, "Test food", NutritionProfile::macros(100.0, 1.0, 2.0, 3.0));
        assert_eq!(db.len(), 1);

        let profile = db.get_profile(1).await.unwrap();
        assert_eq!(profile.calories_per_100g, 100.0);
        assert!(matches!(db.get_profile(2).await, Err(FoodDbError::NotFound(2))));
    }
}
