//! Dish-level nutrition aggregation
//!
//! Folds a list of ingredients into one `NutritionTotals`. Ingredients without
//! a resolved profile do not participate.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Ingredient, NutritionTotals};

/// How optional fields (fiber, sugar) are totalled when some ingredients lack them
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionalFieldPolicy {
    /// A missing value contributes 0
    #[default]
    ZeroFill,
    /// A missing value makes the whole optional total unknown
    RequireAll,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown optional_fields policy '{0}' (expected zero_fill or require_all)")]
pub struct UnknownPolicy(pub String);

impl OptionalFieldPolicy {
    /// Name as accepted by `FromStr` and stored with dish snapshots
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionalFieldPolicy::ZeroFill => "zero_fill",
            OptionalFieldPolicy::RequireAll => "require_all",
        }
    }
}

impl FromStr for OptionalFieldPolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "zero_fill" | "zerofill" => Ok(OptionalFieldPolicy::ZeroFill),
            "require_all" | "requireall" => Ok(OptionalFieldPolicy::RequireAll),
            _ => Err(UnknownPolicy(s.trim().to_string())),
        }
    }
}

/// Total nutrition of the resolved ingredients, zero-filling optional fields
pub fn aggregate(ingredients: &[Ingredient]) -> NutritionTotals {
    aggregate_with(ingredients, OptionalFieldPolicy::ZeroFill)
}

/// Total nutrition of the resolved ingredients under the given policy
pub fn aggregate_with(ingredients: &[Ingredient], policy: OptionalFieldPolicy) -> NutritionTotals {
    let scaled: Vec<NutritionTotals> = ingredients
        .iter()
        .filter_map(Ingredient::scaled_nutrition)
        .collect();

    NutritionTotals {
        calories: ordered_sum(scaled.iter().map(|n| n.calories)),
        protein: ordered_sum(scaled.iter().map(|n| n.protein)),
        carbs: ordered_sum(scaled.iter().map(|n| n.carbs)),
        fat: ordered_sum(scaled.iter().map(|n| n.fat)),
        fiber: optional_sum(scaled.iter().map(|n| n.fiber), policy),
        sugar: optional_sum(scaled.iter().map(|n| n.sugar), policy),
    }
}

/// Sum in sorted order so the result does not depend on list order
fn ordered_sum(values: impl Iterator<Item = f64>) -> f64 {
    let mut values: Vec<f64> = values.collect();
    values.sort_by(f64::total_cmp);
    values.into_iter().fold(0.0, |acc, v| acc + v)
}

fn optional_sum(
    values: impl Iterator<Item = Option<f64>>,
    policy: OptionalFieldPolicy,
) -> Option<f64> {
    match policy {
        OptionalFieldPolicy::ZeroFill => Some(ordered_sum(values.map(|v| v.unwrap_or(0.0)))),
        OptionalFieldPolicy::RequireAll => {
            let present: Option<Vec<f64>> = values.collect();
            present.map(|v| ordered_sum(v.into_iter()))
        }
    }
}
