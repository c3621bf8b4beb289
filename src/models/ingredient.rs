//! Ingredient model
//!
//! An ingredient is a named amount of food, optionally linked to an external
//! food record whose per-100g profile is cached on it.

use serde::{Deserialize, Serialize};

use super::{NutritionProfile, NutritionTotals};
use crate::nutrition::scale;

/// An ingredient being edited as part of a dish
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: String,
    pub name: String,
    pub amount: f64,
    pub unit: String,
    /// External food database id (USDA FDC id)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<u64>,
    /// Cached per-100g profile; `None` until resolved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nutrition: Option<NutritionProfile>,
}

/// The persisted form of an ingredient (no nutrition, that is refetched)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedIngredient {
    pub id: String,
    pub name: String,
    pub amount: f64,
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<u64>,
}

impl Ingredient {
    pub fn new(id: impl Into<String>, name: impl Into<String>, amount: f64, unit: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            amount,
            unit: unit.into(),
            source_id: None,
            nutrition: None,
        }
    }

    pub fn with_source(mut self, source_id: u64) -> Self {
        self.source_id = Some(source_id);
        self
    }

    pub fn with_nutrition(mut self, profile: NutritionProfile) -> Self {
        self.nutrition = Some(profile);
        self
    }

    pub fn is_resolved(&self) -> bool {
        self.nutrition.is_some()
    }

    /// Absolute nutrition of this ingredient, if its profile is resolved
    pub fn scaled_nutrition(&self) -> Option<NutritionTotals> {
        self.nutrition
            .as_ref()
            .map(|profile| scale(profile, self.amount, &self.unit))
    }

    pub fn to_saved(&self) -> SavedIngredient {
        SavedIngredient {
            id: self.id.clone(),
            name: self.name.clone(),
            amount: self.amount,
            unit: self.unit.clone(),
            source_id: self.source_id,
        }
    }
}

impl From<SavedIngredient> for Ingredient {
    fn from(saved: SavedIngredient) -> Self {
        Self {
            id: saved.id,
            name: saved.name,
            amount: saved.amount,
            unit: saved.unit,
            source_id: saved.source_id,
            nutrition: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_has_no_scaled_nutrition() {
        let ing = Ingredient::new("1", "Mystery sauce", 50.0, "g");
        assert!(!ing.is_resolved());
        assert_eq!(ing.scaled_nutrition(), None);
    }

    #[test]
    fn test_scaled_nutrition_uses_unit() {
        let ing = Ingredient::new("1", "Rice", 1.0, "cup")
            .with_nutrition(NutritionProfile::macros(130.0, 2.7, 28.0, 0.3));
        let scaled = ing.scaled_nutrition().unwrap();
        assert!((scaled.calories - 312.0).abs() < 1e-9);
    }

    #[test]
    fn test_saved_round_trip_drops_profile() {
        let ing = Ingredient::new("7", "Chicken", 200.0, "g")
            .with_source(171_477)
            .with_nutrition(NutritionProfile::macros(165.0, 31.0, 0.0, 3.6));
        let saved = ing.to_saved();
        assert_eq!(saved.source_id, Some(171_477));

        let restored = Ingredient::from(saved);
        assert_eq!(restored.name, "Chicken");
        assert_eq!(restored.nutrition, None);
    }
}
