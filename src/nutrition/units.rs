//! Unit types and conversion constants
//!
//! Every supported unit maps to a fixed gram factor. Volume units use a
//! water-like density (1 ml = 1 g), which is close enough for menu labelling.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from strict unit handling
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UnitError {
    #[error("Unknown unit: '{0}'")]
    Unknown(String),

    #[error("Amount must be greater than 0, got {0}")]
    NonPositiveAmount(f64),
}

/// Category of a measurement unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitCategory {
    Weight,
    Volume,
}

/// A unit the ingredient form offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "g")]
    Gram,
    #[serde(rename = "kg")]
    Kilogram,
    #[serde(rename = "oz")]
    Ounce,
    #[serde(rename = "lb")]
    Pound,
    #[serde(rename = "ml")]
    Milliliter,
    #[serde(rename = "l")]
    Liter,
    #[serde(rename = "cup")]
    Cup,
    #[serde(rename = "tbsp")]
    Tablespoon,
    #[serde(rename = "tsp")]
    Teaspoon,
}

// ============================================================================
// Conversion Constants (to grams)
// ============================================================================

pub const G_PER_KG: f64 = 1000.0;
pub const G_PER_OZ: f64 = 28.35;
pub const G_PER_LB: f64 = 453.592;
pub const G_PER_ML: f64 = 1.0;
pub const G_PER_L: f64 = 1000.0;
pub const G_PER_CUP: f64 = 240.0;
pub const G_PER_TBSP: f64 = 15.0;
pub const G_PER_TSP: f64 = 5.0;

impl Unit {
    /// Units in the order the dish form lists them
    pub const ALL: [Unit; 9] = [
        Unit::Gram,
        Unit::Kilogram,
        Unit::Ounce,
        Unit::Pound,
        Unit::Milliliter,
        Unit::Liter,
        Unit::Cup,
        Unit::Tablespoon,
        Unit::Teaspoon,
    ];

    /// Recognize one of the unit codes (case-insensitive, surrounding whitespace ignored)
    ///
    /// Spelled-out names and plurals are not codes and yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.trim().to_lowercase();
        match lower.as_str() {
            "g" => Some(Unit::Gram),
            "kg" => Some(Unit::Kilogram),
            "oz" => Some(Unit::Ounce),
            "lb" => Some(Unit::Pound),
            "ml" => Some(Unit::Milliliter),
            "l" => Some(Unit::Liter),
            "cup" => Some(Unit::Cup),
            "tbsp" => Some(Unit::Tablespoon),
            "tsp" => Some(Unit::Teaspoon),
            _ => None,
        }
    }

    /// Short code, as stored with saved ingredients
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Gram => "g",
            Unit::Kilogram => "kg",
            Unit::Ounce => "oz",
            Unit::Pound => "lb",
            Unit::Milliliter => "ml",
            Unit::Liter => "l",
            Unit::Cup => "cup",
            Unit::Tablespoon => "tbsp",
            Unit::Teaspoon => "tsp",
        }
    }

    pub fn grams_factor(&self) -> f64 {
        match self {
            Unit::Gram => 1.0,
            Unit::Kilogram => G_PER_KG,
            Unit::Ounce => G_PER_OZ,
            Unit::Pound => G_PER_LB,
            Unit::Milliliter => G_PER_ML,
            Unit::Liter => G_PER_L,
            Unit::Cup => G_PER_CUP,
            Unit::Tablespoon => G_PER_TBSP,
            Unit::Teaspoon => G_PER_TSP,
        }
    }

    pub fn category(&self) -> UnitCategory {
        match self {
            Unit::Gram | Unit::Kilogram | Unit::Ounce | Unit::Pound => UnitCategory::Weight,
            _ => UnitCategory::Volume,
        }
    }

    pub fn to_grams(&self, amount: f64) -> f64 {
        amount * self.grams_factor()
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Unit {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Unit::parse(s).ok_or_else(|| UnitError::Unknown(s.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_codes() {
        for unit in Unit::ALL {
            assert_eq!(Unit::parse(unit.as_str()), Some(unit));
        }
    }

    #[test]
    fn test_parse_is_case_and_space_insensitive() {
        assert_eq!(Unit::parse(" KG "), Some(Unit::Kilogram));
        assert_eq!(Unit::parse("L"), Some(Unit::Liter));
        assert_eq!(Unit::parse("TBSP"), Some(Unit::Tablespoon));
        assert_eq!(Unit::parse("handful"), None);
        assert_eq!(Unit::parse(""), None);
    }

    #[test]
    fn test_parse_rejects_names_and_plurals() {
        for s in ["cups", "gram", "lbs", "pounds", "tablespoons", "litre", "ounces"] {
            assert_eq!(Unit::parse(s), None, "{s}");
        }
    }

    #[test]
    fn test_grams_factors() {
        assert_eq!(Unit::Kilogram.grams_factor(), 1000.0);
        assert_eq!(Unit::Ounce.grams_factor(), 28.35);
        assert_eq!(Unit::Pound.grams_factor(), 453.592);
        assert_eq!(Unit::Liter.grams_factor(), 1000.0);
        assert_eq!(Unit::Milliliter.grams_factor(), 1.0);
        assert_eq!(Unit::Cup.grams_factor(), 240.0);
        assert_eq!(Unit::Tablespoon.grams_factor(), 15.0);
        assert_eq!(Unit::Teaspoon.grams_factor(), 5.0);
    }

    #[test]
    fn test_categories() {
        assert_eq!(Unit::Ounce.category(), UnitCategory::Weight);
        assert_eq!(Unit::Cup.category(), UnitCategory::Volume);
        assert_eq!(Unit::Liter.category(), UnitCategory::Volume);
    }

    #[test]
    fn test_from_str_reports_unknown() {
        let err = "pinch".parse::<Unit>().unwrap_err();
        assert_eq!(err, UnitError::Unknown("pinch".to_string()));
    }

    #[test]
    fn test_serde_uses_codes() {
        assert_eq!(serde_json::to_string(&Unit::Tablespoon).unwrap(), "\"tbsp\"");
        let unit: Unit = serde_json::from_str("\"lb\"").unwrap();
        assert_eq!(unit, Unit::Pound);
    }
}
