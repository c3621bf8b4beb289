//! Unit normalization and per-serving scaling
//!
//! Profiles are always per 100 g, so every amount is first brought to grams
//! and the profile is then scaled by `grams / 100`.

use super::units::{Unit, UnitError};
use crate::models::{NutritionProfile, NutritionTotals};

/// Convert an amount in the given unit to grams
///
/// Unknown units are read as grams already. This never fails; use
/// [`normalize_strict`] where unknown units must be rejected.
pub fn normalize(amount: f64, unit: &str) -> f64 {
    match Unit::parse(unit) {
        Some(u) => u.to_grams(amount),
        None => {
            tracing::debug!(unit, amount, "Unrecognized unit, treating amount as grams");
            amount
        }
    }
}

/// Convert to grams, rejecting unknown units and non-positive amounts
pub fn normalize_strict(amount: f64, unit: &str) -> Result<f64, UnitError> {
    // `!(x > 0)` also catches NaN
    if !(amount > 0.0) {
        return Err(UnitError::NonPositiveAmount(amount));
    }
    let unit: Unit = unit.parse()?;
    Ok(unit.to_grams(amount))
}

/// Absolute nutrition for `grams` of a food described per 100 g
///
/// Absent optional fields stay absent; the profile itself is untouched.
pub fn scale_grams(profile: &NutritionProfile, grams: f64) -> NutritionTotals {
    let factor = grams / 100.0;
    NutritionTotals {
        calories: profile.calories_per_100g * factor,
        protein: profile.protein_per_100g * factor,
        carbs: profile.carbs_per_100g * factor,
        fat: profile.fat_per_100g * factor,
        fiber: profile.fiber_per_100g.map(|v| v * factor),
        sugar: profile.sugar_per_100g.map(|v| v * factor),
    }
}

/// Absolute nutrition for `amount` `unit` of a food described per 100 g
pub fn scale(profile: &NutritionProfile, amount: f64, unit: &str) -> NutritionTotals {
    scale_grams(profile, normalize(amount, unit))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_normalize_kg() {
        for a in [0.001, 0.25, 1.0, 3.7, 250.0] {
            assert_eq!(normalize(a, "kg"), a * 1000.0);
        }
    }

    #[test]
    fn test_normalize_table() {
        assert_eq!(normalize(2.0, "g"), 2.0);
        assert!(close(normalize(2.0, "oz"), 56.7));
        assert!(close(normalize(1.0, "lb"), 453.592));
        assert_eq!(normalize(0.5, "l"), 500.0);
        assert_eq!(normalize(30.0, "ml"), 30.0);
        assert_eq!(normalize(1.0, "cup"), 240.0);
        assert_eq!(normalize(2.0, "tbsp"), 30.0);
        assert_eq!(normalize(3.0, "tsp"), 15.0);
    }

    #[test]
    fn test_normalize_unknown_unit_is_grams() {
        for (a, u) in [(1.0, "pinch"), (42.5, "handful"), (7.0, ""), (3.0, "slice (28g)")] {
            assert_eq!(normalize(a, u), a);
        }
    }

    #[test]
    fn test_normalize_unit_names_are_not_codes() {
        for (a, u) in [(2.0, "cups"), (2.0, "pounds"), (2.0, "litre"), (4.0, "Tablespoons"), (1.5, "grams")] {
            assert_eq!(normalize(a, u), a, "{u}");
        }
        assert_eq!(normalize(2.0, " CUP "), 480.0);
    }

    #[test]
    fn test_normalize_strict() {
        assert_eq!(normalize_strict(2.0, "kg"), Ok(2000.0));
        assert_eq!(
            normalize_strict(2.0, "pinch"),
            Err(UnitError::Unknown("pinch".to_string()))
        );
        assert_eq!(normalize_strict(0.0, "g"), Err(UnitError::NonPositiveAmount(0.0)));
        assert!(normalize_strict(f64::NAN, "g").is_err());
    }

    #[test]
    fn test_scale_identity_at_100g() {
        let profile = NutritionProfile::macros(165.0, 31.0, 0.0, 3.6)
            .with_fiber(1.1)
            .with_sugar(0.3);
        assert_eq!(scale(&profile, 100.0, "g"), profile.per_100g());
    }

    #[test]
    fn test_scale_chicken_150g() {
        let profile = NutritionProfile::macros(165.0, 31.0, 0.0, 3.6);
        let scaled = scale(&profile, 150.0, "g");
        assert!(close(scaled.calories, 247.5));
        assert!(close(scaled.protein, 46.5));
        assert_eq!(scaled.carbs, 0.0);
        assert!(close(scaled.fat, 5.4));
        assert_eq!(scaled.fiber, None);
        assert_eq!(scaled.sugar, None);
    }

    #[test]
    fn test_scale_keeps_present_zero_optional() {
        let profile = NutritionProfile::macros(10.0, 1.0, 1.0, 1.0).with_fiber(0.0);
        let scaled = scale(&profile, 1.0, "cup");
        assert_eq!(scaled.fiber, Some(0.0));
        assert!(close(scaled.calories, 24.0));
    }

    #[test]
    fn test_scale_does_not_touch_profile() {
        let profile = NutritionProfile::macros(100.0, 10.0, 10.0, 10.0);
        let before = profile;
        let _ = scale(&profile, 3.0, "kg");
        assert_eq!(profile, before);
    }
}
