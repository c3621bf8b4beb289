//! External food database
//!
//! Looks up foods and their per-100g nutrition profiles. The nutrition core
//! never calls this directly; profiles are fetched once per ingredient and
//! cached on it.

mod memory;
mod usda;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::NutritionProfile;

pub use memory::MemoryFoodDatabase;
pub use usda::{profile_from_nutrients, FoodNutrient, NutrientRef, UsdaClient, UsdaConfig};

/// Errors at the food database boundary
#[derive(Debug, Error)]
pub enum FoodDbError {
    #[error("Search query cannot be empty")]
    EmptyQuery,

    #[error("Food database request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Food database returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Could not decode food database response: {0}")]
    Decode(String),

    #[error("Food not found: {0}")]
    NotFound(u64),
}

/// A search hit, enough to let a user pick a food
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodSearchResult {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    pub data_type: String,
}

/// Food lookup service
#[async_trait]
pub trait FoodDatabase: Send + Sync {
    /// Search foods by free text
    async fn search_food(&self, query: &str) -> Result<Vec<FoodSearchResult>, FoodDbError>;

    /// Per-100g nutrition profile of one food
    async fn get_profile(&self, id: u64) -> Result<NutritionProfile, FoodDbError>;
}
