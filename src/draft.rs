//! Dish draft
//!
//! The ingredient list of a dish while it is being edited. Every edit
//! replaces the list with a new one, and totals are always recomputed from
//! the current list.

use std::collections::HashMap;

use serde::Serialize;

use crate::fooddb::{FoodDatabase, FoodSearchResult};
use crate::models::{Ingredient, NutritionProfile, NutritionTotals, SavedIngredient};
use crate::nutrition::{aggregate_with, OptionalFieldPolicy};

/// An ingredient whose profile could not be fetched
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolveFailure {
    pub ingredient_id: String,
    pub name: String,
    pub source_id: u64,
    pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct DishDraft {
    ingredients: Vec<Ingredient>,
    next_seq: u64,
}

impl DishDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a draft from persisted ingredients; profiles start unresolved
    pub fn from_saved(saved: Vec<SavedIngredient>) -> Self {
        let ingredients: Vec<Ingredient> = saved.into_iter().map(Ingredient::from).collect();
        Self {
            next_seq: ingredients.len() as u64,
            ingredients,
        }
    }

    pub fn ingredients(&self) -> &[Ingredient] {
        &self.ingredients
    }

    pub fn len(&self) -> usize {
        self.ingredients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ingredients.is_empty()
    }

    fn generate_id(&mut self) -> String {
        loop {
            self.next_seq += 1;
            let id = format!("ing-{}", self.next_seq);
            if !self.ingredients.iter().any(|i| i.id == id) {
                return id;
            }
        }
    }

    /// Add a food picked from search results, with its fetched profile
    pub fn add_from_search(
        &mut self,
        result: &FoodSearchResult,
        profile: NutritionProfile,
        amount: f64,
        unit: &str,
    ) -> String {
        let id = self.generate_id();
        let ingredient = Ingredient::new(id.clone(), result.name.clone(), amount, unit)
            .with_source(result.id)
            .with_nutrition(profile);
        self.push(ingredient);
        id
    }

    /// Add a prepared ingredient, assigning an id when it has none
    pub fn add(&mut self, mut ingredient: Ingredient) -> String {
        if ingredient.id.is_empty() || self.ingredients.iter().any(|i| i.id == ingredient.id) {
            ingredient.id = self.generate_id();
        }
        let id = ingredient.id.clone();
        self.push(ingredient);
        id
    }

    fn push(&mut self, ingredient: Ingredient) {
        self.ingredients = self
            .ingredients
            .iter()
            .cloned()
            .chain(std::iter::once(ingredient))
            .collect();
    }

    /// Apply `edit` to the ingredient with `id`; false if there is none
    fn replace_with(&mut self, id: &str, edit: impl Fn(&Ingredient) -> Ingredient) -> bool {
        if !self.ingredients.iter().any(|i| i.id == id) {
            return false;
        }
        self.ingredients = self
            .ingredients
            .iter()
            .map(|i| if i.id == id { edit(i) } else { i.clone() })
            .collect();
        true
    }

    pub fn set_amount(&mut self, id: &str, amount: f64) -> bool {
        self.replace_with(id, |i| Ingredient { amount, ..i.clone() })
    }

    pub fn set_unit(&mut self, id: &str, unit: &str) -> bool {
        self.replace_with(id, |i| Ingredient {
            unit: unit.to_string(),
            ..i.clone()
        })
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.ingredients.len();
        self.ingredients = self
            .ingredients
            .iter()
            .filter(|i| i.id != id)
            .cloned()
            .collect();
        self.ingredients.len() != before
    }

    pub fn totals(&self) -> NutritionTotals {
        self.totals_with(OptionalFieldPolicy::default())
    }

    pub fn totals_with(&self, policy: OptionalFieldPolicy) -> NutritionTotals {
        aggregate_with(&self.ingredients, policy)
    }

    /// Nutrition of one ingredient; `None` if unknown or unresolved
    pub fn ingredient_totals(&self, id: &str) -> Option<NutritionTotals> {
        self.ingredients
            .iter()
            .find(|i| i.id == id)
            .and_then(Ingredient::scaled_nutrition)
    }

    pub fn unresolved_count(&self) -> usize {
        self.ingredients.iter().filter(|i| !i.is_resolved()).count()
    }

    /// Fetch missing profiles by source id
    ///
    /// Each distinct source is looked up once. Ingredients whose lookup
    /// fails stay unresolved and are returned as failures. Ingredients
    /// without a source id are left alone.
    pub async fn resolve(&mut self, food_db: &dyn FoodDatabase) -> Vec<ResolveFailure> {
        let mut fetched: HashMap<u64, Result<NutritionProfile, String>> = HashMap::new();

        for source_id in self
            .ingredients
            .iter()
            .filter(|i| !i.is_resolved())
            .filter_map(|i| i.source_id)
        {
            if fetched.contains_key(&source_id) {
                continue;
            }
            let result = food_db.get_profile(source_id).await.map_err(|e| e.to_string());
            if let Err(e) = &result {
                tracing::warn!(source_id, error = %e, "Could not resolve ingredient profile");
            }
            fetched.insert(source_id, result);
        }

        let mut failures = Vec::new();
        self.ingredients = self
            .ingredients
            .iter()
            .map(|i| match (i.nutrition, i.source_id.and_then(|s| fetched.get(&s))) {
                (None, Some(Ok(profile))) => i.clone().with_nutrition(*profile),
                (None, Some(Err(e))) => {
                    failures.push(ResolveFailure {
                        ingredient_id: i.id.clone(),
                        name: i.name.clone(),
                        source_id: i.source_id.unwrap_or_default(),
                        error: e.clone(),
                    });
                    i.clone()
                }
                _ => i.clone(),
            })
            .collect();

        failures
    }

    pub fn to_saved(&self) -> Vec<SavedIngredient> {
        self.ingredients.iter().map(Ingredient::to_saved).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fooddb::MemoryFoodDatabase;

    fn chicken_result() -> FoodSearchResult {
        FoodSearchResult {
            id: 171477,
            name: "Chicken breast, roasted".to_string(),
            brand: None,
            data_type: "SR Legacy".to_string(),
        }
    }

    fn chicken_profile() -> NutritionProfile {
        NutritionProfile::macros(165.0, 31.0, 0.0, 3.6)
    }

    #[test]
    fn test_add_from_search() {
        let mut draft = DishDraft::new();
        let id = draft.add_from_search(&chicken_result(), chicken_profile(), 200.0, "g");

        assert_eq!(draft.len(), 1);
        let ingredient = &draft.ingredients()[0];
        assert_eq!(ingredient.id, id);
        assert_eq!(ingredient.source_id, Some(171477));
        assert_eq!(ingredient.name, "Chicken breast, roasted");
        assert!(ingredient.is_resolved());
        assert_eq!(draft.totals().calories, 330.0);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let mut draft = DishDraft::new();
        let a = draft.add_from_search(&chicken_result(), chicken_profile(), 100.0, "g");
        let b = draft.add_from_search(&chicken_result(), chicken_profile(), 100.0, "g");
        assert_ne!(a, b);
    }

    #[test]
    fn test_edits_recompute_totals() {
        let mut draft = DishDraft::new();
        let id = draft.add_from_search(&chicken_result(), chicken_profile(), 100.0, "g");
        assert_eq!(draft.totals().calories, 165.0);

        assert!(draft.set_amount(&id, 1.0));
        assert!(draft.set_unit(&id, "kg"));
        assert_eq!(draft.totals().calories, 1650.0);
        assert_eq!(draft.ingredient_totals(&id).map(|t| t.protein), Some(310.0));

        assert!(draft.remove(&id));
        assert!(draft.is_empty());
        assert_eq!(draft.totals(), NutritionTotals::zero());
    }

    #[test]
    fn test_unknown_id_is_noop() {
        let mut draft = DishDraft::new();
        draft.add_from_search(&chicken_result(), chicken_profile(), 100.0, "g");
        let before = draft.ingredients().to_vec();

        assert!(!draft.set_amount("missing", 5.0));
        assert!(!draft.set_unit("missing", "cup"));
        assert!(!draft.remove("missing"));
        assert_eq!(draft.ingredients(), before.as_slice());
        assert_eq!(draft.ingredient_totals("missing"), None);
    }

    #[test]
    fn test_add_reassigns_duplicate_id() {
        let mut draft = DishDraft::new();
        let first = draft.add(Ingredient::new("x", "Salt", 1.0, "g"));
        let second = draft.add(Ingredient::new("x", "Pepper", 1.0, "g"));
        assert_eq!(first, "x");
        assert_ne!(second, "x");
    }

    #[test]
    fn test_saved_round_trip_drops_profiles() {
        let mut draft = DishDraft::new();
        draft.add_from_search(&chicken_result(), chicken_profile(), 150.0, "g");

        let restored = DishDraft::from_saved(draft.to_saved());
        assert_eq!(restored.len(), 1);
        assert_eq!(restored.unresolved_count(), 1);
        assert_eq!(restored.totals(), NutritionTotals::zero());
        assert_eq!(restored.to_saved(), draft.to_saved());
    }

    #[tokio::test]
    async fn test_resolve_fetches_missing_profiles() {
        let food_db = MemoryFoodDatabase::with_reference_foods();
        let saved = vec![
            SavedIngredient {
                id: "a".to_string(),
                name: "Chicken".to_string(),
                amount: 200.0,
                unit: "g".to_string(),
                source_id: Some(171477),
            },
            SavedIngredient {
                id: "b".to_string(),
                name: "Rice".to_string(),
                amount: 1.0,
                unit: "cup".to_string(),
                source_id: Some(169756),
            },
            SavedIngredient {
                id: "c".to_string(),
                name: "Secret sauce".to_string(),
                amount: 10.0,
                unit: "g".to_string(),
                source_id: Some(1),
            },
            SavedIngredient {
                id: "d".to_string(),
                name: "Garnish".to_string(),
                amount: 2.0,
                unit: "g".to_string(),
                source_id: None,
            },
        ];

        let mut draft = DishDraft::from_saved(saved);
        let failures = draft.resolve(&food_db).await;

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].ingredient_id, "c");
        assert_eq!(failures[0].source_id, 1);
        assert_eq!(draft.unresolved_count(), 2);
        assert!((draft.totals().calories - 642.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_resolve_keeps_existing_profiles() {
        let food_db = MemoryFoodDatabase::new();
        let mut draft = DishDraft::new();
        draft.add_from_search(&chicken_result(), chicken_profile(), 100.0, "g");

        let failures = draft.resolve(&food_db).await;
        assert!(failures.is_empty());
        assert_eq!(draft.totals().calories, 165.0);
    }
}
