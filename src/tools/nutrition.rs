//! Nutrition Calculation Tools
//!
//! Stateless calculations: unit table, ad-hoc aggregation and single
//! ingredient scaling.

use serde::Serialize;

use crate::models::{Ingredient, NutritionProfile, NutritionTotals};
use crate::nutrition::{
    aggregate_with, normalize_strict, scale_grams, OptionalFieldPolicy, Unit, UnitCategory,
};

/// Decimal places in tool responses
pub const DISPLAY_DECIMALS: u32 = 2;

#[derive(Debug, Serialize)]
pub struct UnitInfo {
    pub code: &'static str,
    pub grams: f64,
    pub category: UnitCategory,
}

#[derive(Debug, Serialize)]
pub struct ListUnitsResponse {
    pub units: Vec<UnitInfo>,
    pub note: &'static str,
}

/// Nutrition contributed by one ingredient
#[derive(Debug, Serialize)]
pub struct IngredientBreakdown {
    pub id: String,
    pub name: String,
    pub grams: f64,
    /// `None` for ingredients without a profile
    pub nutrition: Option<NutritionTotals>,
}

#[derive(Debug, Serialize)]
pub struct CalculateNutritionResponse {
    pub totals: NutritionTotals,
    pub policy: OptionalFieldPolicy,
    pub ingredients: Vec<IngredientBreakdown>,
    pub unresolved: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ScaleIngredientResponse {
    pub amount: f64,
    pub unit: String,
    pub grams: f64,
    pub nutrition: NutritionTotals,
}

pub fn list_units() -> ListUnitsResponse {
    ListUnitsResponse {
        units: Unit::ALL
            .iter()
            .map(|u| UnitInfo {
                code: u.as_str(),
                grams: u.grams_factor(),
                category: u.category(),
            })
            .collect(),
        note: "Volumes convert at the density of water (1 ml = 1 g)",
    }
}

/// Parse an optional policy name, defaulting to zero-fill
pub fn parse_policy(policy: Option<&str>) -> Result<OptionalFieldPolicy, String> {
    match policy {
        None => Ok(OptionalFieldPolicy::default()),
        Some(s) => s.parse::<OptionalFieldPolicy>().map_err(|e| e.to_string()),
    }
}

/// Reject unknown units and non-positive amounts before they reach the core
pub fn validate_ingredients<'a, I>(ingredients: I) -> Result<(), String>
where
    I: IntoIterator<Item = (&'a str, f64, &'a str)>,
{
    for (name, amount, unit) in ingredients {
        if name.trim().is_empty() {
            return Err("Ingredient name cannot be empty".to_string());
        }
        normalize_strict(amount, unit).map_err(|e| format!("Ingredient '{}': {}", name, e))?;
    }
    Ok(())
}

/// Aggregate an ingredient list supplied with inline profiles
pub fn calculate_nutrition(
    ingredients: Vec<Ingredient>,
    policy: Option<&str>,
) -> Result<CalculateNutritionResponse, String> {
    let policy = parse_policy(policy)?;
    validate_ingredients(
        ingredients
            .iter()
            .map(|i| (i.name.as_str(), i.amount, i.unit.as_str())),
    )?;

    let totals = aggregate_with(&ingredients, policy).rounded(DISPLAY_DECIMALS);

    let breakdown = ingredients
        .iter()
        .map(|i| IngredientBreakdown {
            id: i.id.clone(),
            name: i.name.clone(),
            grams: crate::nutrition::normalize(i.amount, &i.unit),
            nutrition: i.scaled_nutrition().map(|n| n.rounded(DISPLAY_DECIMALS)),
        })
        .collect();

    let unresolved = ingredients
        .iter()
        .filter(|i| !i.is_resolved())
        .map(|i| i.name.clone())
        .collect();

    Ok(CalculateNutritionResponse {
        totals,
        policy,
        ingredients: breakdown,
        unresolved,
    })
}

/// Scale one per-100g profile to an amount
pub fn scale_ingredient(
    profile: &NutritionProfile,
    amount: f64,
    unit: &str,
) -> Result<ScaleIngredientResponse, String> {
    let grams = normalize_strict(amount, unit).map_err(|e| e.to_string())?;

    Ok(ScaleIngredientResponse {
        amount,
        unit: unit.trim().to_lowercase(),
        grams,
        nutrition: scale_grams(profile, grams).rounded(DISPLAY_DECIMALS),
    })
}
