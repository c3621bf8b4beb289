//! Shared nutrition data structures
//!
//! `NutritionProfile` is what the food database hands back (values per 100 g);
//! `NutritionTotals` is what scaling and aggregation produce.

use serde::{Deserialize, Serialize};

/// Macro and calorie values for a 100 g reference quantity
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionProfile {
    pub calories_per_100g: f64,
    pub protein_per_100g: f64, // grams
    pub carbs_per_100g: f64,   // grams
    pub fat_per_100g: f64,     // grams
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fiber_per_100g: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sugar_per_100g: Option<f64>,
}

impl NutritionProfile {
    /// Profile with only the four required macros set
    pub fn macros(calories: f64, protein: f64, carbs: f64, fat: f64) -> Self {
        Self {
            calories_per_100g: calories,
            protein_per_100g: protein,
            carbs_per_100g: carbs,
            fat_per_100g: fat,
            fiber_per_100g: None,
            sugar_per_100g: None,
        }
    }

    pub fn with_fiber(mut self, fiber: f64) -> Self {
        self.fiber_per_100g = Some(fiber);
        self
    }

    pub fn with_sugar(mut self, sugar: f64) -> Self {
        self.sugar_per_100g = Some(sugar);
        self
    }

    /// The profile read as the totals for exactly 100 g
    pub fn per_100g(&self) -> NutritionTotals {
        NutritionTotals {
            calories: self.calories_per_100g,
            protein: self.protein_per_100g,
            carbs: self.carbs_per_100g,
            fat: self.fat_per_100g,
            fiber: self.fiber_per_100g,
            sugar: self.sugar_per_100g,
        }
    }
}

/// Absolute nutrition for a quantity of food, or the sum over a dish
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NutritionTotals {
    pub calories: f64,
    pub protein: f64, // grams
    pub carbs: f64,   // grams
    pub fat: f64,     // grams
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fiber: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sugar: Option<f64>,
}

impl NutritionTotals {
    /// All-zero totals, optional fields included
    pub fn zero() -> Self {
        Self {
            calories: 0.0,
            protein: 0.0,
            carbs: 0.0,
            fat: 0.0,
            fiber: Some(0.0),
            sugar: Some(0.0),
        }
    }

    /// Copy with every value rounded to `decimals` places, for display
    pub fn rounded(&self, decimals: u32) -> Self {
        let factor = 10f64.powi(decimals as i32);
        let round = |v: f64| (v * factor).round() / factor;
        Self {
            calories: round(self.calories),
            protein: round(self.protein),
            carbs: round(self.carbs),
            fat: round(self.fat),
            fiber: self.fiber.map(round),
            sugar: self.sugar.map(round),
        }
    }
}

impl Default for NutritionTotals {
    fn default() -> Self {
        Self::zero()
    }
}
