//! Menutri MCP Server Implementation
//!
//! Implements the MCP server with all menutri tools.

use std::path::PathBuf;
use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};

use crate::db::Database;
use crate::fooddb::FoodDatabase;
use crate::models::{ComponentCreate, DishComponentInput, DishCreate, DishUpdate, Ingredient, NutritionProfile, SavedIngredient};
use crate::tools::status::StatusTracker;
use crate::tools::{components, dishes, food_search, nutrition};

/// Menutri MCP Service
#[derive(Clone)]
pub struct MenutriService {
    status_tracker: Arc<StatusTracker>,
    database: Database,
    food_db: Arc<dyn FoodDatabase>,
    tool_router: ToolRouter<MenutriService>,
}

impl MenutriService {
    pub fn new(
        database_path: PathBuf,
        database: Database,
        food_db: Arc<dyn FoodDatabase>,
        food_db_label: &str,
    ) -> Self {
        Self {
            status_tracker: Arc::new(StatusTracker::new(database_path, food_db_label)),
            database,
            food_db,
            tool_router: Self::tool_router(),
        }
    }
}

fn json_response<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

fn not_found(entity: &str, id: i64) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(format!(
        r#"{{"error": "{} not found", "id": {}}}"#,
        entity, id
    ))]))
}

// ============================================================================
// Nutrition Parameter Structs
// ============================================================================

/// Nutrition values per 100 g
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ProfileParams {
    pub calories_per_100g: f64,
    pub protein_per_100g: f64,
    pub carbs_per_100g: f64,
    pub fat_per_100g: f64,
    pub fiber_per_100g: Option<f64>,
    pub sugar_per_100g: Option<f64>,
}

impl From<ProfileParams> for NutritionProfile {
    fn from(p: ProfileParams) -> Self {
        NutritionProfile {
            calories_per_100g: p.calories_per_100g,
            protein_per_100g: p.protein_per_100g,
            carbs_per_100g: p.carbs_per_100g,
            fat_per_100g: p.fat_per_100g,
            fiber_per_100g: p.fiber_per_100g,
            sugar_per_100g: p.sugar_per_100g,
        }
    }
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct IngredientParams {
    /// Client-side id (generated when omitted)
    pub id: Option<String>,
    pub name: String,
    pub amount: f64,
    /// g, kg, oz, lb, ml, l, cup, tbsp, tsp
    pub unit: String,
    /// Food database id (USDA fdcId)
    pub source_id: Option<u64>,
    /// Per-100g profile; ingredients without one count as zero
    pub per_100g: Option<ProfileParams>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CalculateNutritionParams {
    pub ingredients: Vec<IngredientParams>,
    /// zero_fill (default) or require_all
    pub optional_fields: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ScaleIngredientParams {
    pub per_100g: ProfileParams,
    pub amount: f64,
    pub unit: String,
}

// ============================================================================
// Food Database Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchFoodParams {
    pub query: String,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

fn default_search_limit() -> usize { 10 }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetFoodProfileParams {
    /// Food database id (USDA fdcId)
    pub id: u64,
}

// ============================================================================
// Dish Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateDishParams {
    pub restaurant_id: i64,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub price: f64,
    pub image_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

fn default_true() -> bool { true }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DishIdParams {
    /// Dish ID
    pub id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListDishesParams {
    pub restaurant_id: i64,
    /// Only dishes currently on the menu (default false)
    #[serde(default)]
    pub available_only: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateDishParams {
    pub id: i64,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub image_url: Option<String>,
    pub is_available: Option<bool>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SavedIngredientParams {
    /// Client-side id (generated when omitted)
    pub id: Option<String>,
    pub name: String,
    pub amount: f64,
    pub unit: String,
    /// Food database id (USDA fdcId); unlinked ingredients count as zero
    pub source_id: Option<u64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SaveDishIngredientsParams {
    pub dish_id: i64,
    /// Full ingredient list; replaces the saved one
    pub ingredients: Vec<SavedIngredientParams>,
    /// zero_fill (default) or require_all
    pub optional_fields: Option<String>,
}

// ============================================================================
// Component Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddComponentParams {
    pub name: String,
    pub kcal_per_100g: f64,
    pub protein_per_100g: f64,
    pub carbs_per_100g: f64,
    pub fat_per_100g: f64,
    /// Allergen names; unknown names are created
    #[serde(default)]
    pub allergens: Vec<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ComponentIdParams {
    /// Component ID
    pub id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListComponentsParams {
    /// Name fragment to filter by
    pub query: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddAllergenParams {
    pub name: String,
    pub severity_level: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DishComponentParams {
    pub component_id: i64,
    /// Grams of the component in one serving
    pub amount: f64,
    #[serde(default)]
    pub is_optional: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetDishComponentsParams {
    pub dish_id: i64,
    /// Full component list; replaces the current one
    pub components: Vec<DishComponentParams>,
}

#[tool_router]
impl MenutriService {
    // --- Status ---

    #[tool(description = "Get the current status of the menutri service including build info, database status, food database backend, and process information")]
    fn menutri_status(&self) -> Result<CallToolResult, McpError> {
        json_response(&self.status_tracker.get_status())
    }

    #[tool(description = "Get step-by-step instructions for computing dish nutrition and managing components and allergens. Call this before building a dish.")]
    fn nutrition_instructions(&self) -> Result<CallToolResult, McpError> {
        use crate::tools::status::NUTRITION_INSTRUCTIONS;
        Ok(CallToolResult::success(vec![Content::text(NUTRITION_INSTRUCTIONS)]))
    }

    // --- Nutrition ---

    #[tool(description = "List the supported ingredient units and their gram conversion factors")]
    fn list_units(&self) -> Result<CallToolResult, McpError> {
        json_response(&nutrition::list_units())
    }

    #[tool(description = "Total the nutrition of an ingredient list with inline per-100g profiles. Nothing is stored.")]
    fn calculate_nutrition(&self, Parameters(p): Parameters<CalculateNutritionParams>) -> Result<CallToolResult, McpError> {
        let ingredients: Vec<Ingredient> = p
            .ingredients
            .into_iter()
            .enumerate()
            .map(|(index, i)| Ingredient {
                id: i.id.unwrap_or_else(|| format!("ing-{}", index + 1)),
                name: i.name,
                amount: i.amount,
                unit: i.unit,
                source_id: i.source_id,
                nutrition: i.per_100g.map(NutritionProfile::from),
            })
            .collect();
        let result = nutrition::calculate_nutrition(ingredients, p.optional_fields.as_deref())
            .map_err(|e| McpError::internal_error(e, None))?;
        json_response(&result)
    }

    #[tool(description = "Scale a per-100g nutrition profile to an amount and unit")]
    fn scale_ingredient(&self, Parameters(p): Parameters<ScaleIngredientParams>) -> Result<CallToolResult, McpError> {
        let profile = NutritionProfile::from(p.per_100g);
        let result = nutrition::scale_ingredient(&profile, p.amount, &p.unit)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_response(&result)
    }

    // --- Food Database ---

    #[tool(description = "Search the food database (USDA FoodData Central) by name. Returns ids to use as ingredient source_id.")]
    async fn search_food(&self, Parameters(p): Parameters<SearchFoodParams>) -> Result<CallToolResult, McpError> {
        let result = food_search::search_food(self.food_db.as_ref(), &p.query, p.limit)
            .await
            .map_err(|e| McpError::internal_error(e, None))?;
        json_response(&result)
    }

    #[tool(description = "Get the per-100g nutrition profile of a food database entry")]
    async fn get_food_profile(&self, Parameters(p): Parameters<GetFoodProfileParams>) -> Result<CallToolResult, McpError> {
        let result = food_search::get_food_profile(self.food_db.as_ref(), p.id)
            .await
            .map_err(|e| McpError::internal_error(e, None))?;
        json_response(&result)
    }

    // --- Dishes ---

    #[tool(description = "Create a dish on a restaurant menu")]
    fn create_dish(&self, Parameters(p): Parameters<CreateDishParams>) -> Result<CallToolResult, McpError> {
        let data = DishCreate {
            restaurant_id: p.restaurant_id,
            name: p.name,
            description: p.description,
            price: p.price,
            image_url: p.image_url,
            is_available: p.is_available,
        };
        let result = dishes::create_dish(&self.database, data).map_err(|e| McpError::internal_error(e, None))?;
        json_response(&result)
    }

    #[tool(description = "Get a dish with its saved ingredients, components, allergens and nutrition")]
    fn get_dish(&self, Parameters(p): Parameters<DishIdParams>) -> Result<CallToolResult, McpError> {
        match dishes::get_dish(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))? {
            Some(detail) => json_response(&detail),
            None => not_found("Dish", p.id),
        }
    }

    #[tool(description = "List the dishes of a restaurant")]
    fn list_dishes(&self, Parameters(p): Parameters<ListDishesParams>) -> Result<CallToolResult, McpError> {
        let result = dishes::list_dishes(&self.database, p.restaurant_id, p.available_only)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_response(&result)
    }

    #[tool(description = "Update dish name, description, price, image or availability")]
    fn update_dish(&self, Parameters(p): Parameters<UpdateDishParams>) -> Result<CallToolResult, McpError> {
        let data = DishUpdate {
            name: p.name,
            description: p.description,
            price: p.price,
            image_url: p.image_url,
            is_available: p.is_available,
        };
        match dishes::update_dish(&self.database, p.id, data).map_err(|e| McpError::internal_error(e, None))? {
            Some(dish) => json_response(&dish),
            None => not_found("Dish", p.id),
        }
    }

    #[tool(description = "Delete a dish with its saved ingredients and component links")]
    fn delete_dish(&self, Parameters(p): Parameters<DishIdParams>) -> Result<CallToolResult, McpError> {
        let result = dishes::delete_dish(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        json_response(&result)
    }

    #[tool(description = "Save the full ingredient list of a dish. Profiles are fetched from the food database, totals computed and stored on the dish.")]
    async fn save_dish_ingredients(&self, Parameters(p): Parameters<SaveDishIngredientsParams>) -> Result<CallToolResult, McpError> {
        let ingredients: Vec<SavedIngredient> = p
            .ingredients
            .into_iter()
            .map(|i| SavedIngredient {
                id: i.id.unwrap_or_default(),
                name: i.name,
                amount: i.amount,
                unit: i.unit,
                source_id: i.source_id,
            })
            .collect();
        let result = dishes::save_dish_ingredients(
            &self.database,
            self.food_db.as_ref(),
            p.dish_id,
            ingredients,
            p.optional_fields.as_deref(),
        )
        .await
        .map_err(|e| McpError::internal_error(e, None))?;
        json_response(&result)
    }

    #[tool(description = "Refetch ingredient profiles for a dish and rewrite its stored nutrition")]
    async fn recalculate_dish(&self, Parameters(p): Parameters<DishIdParams>) -> Result<CallToolResult, McpError> {
        let result = dishes::recalculate_dish(&self.database, self.food_db.as_ref(), p.id)
            .await
            .map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(result) => json_response(&result),
            None => json_response(&serde_json::json!({
                "dish_id": p.id,
                "recalculated": false,
                "reason": "Dish has no saved ingredients; stored nutrition left unchanged"
            })),
        }
    }

    // --- Components ---

    #[tool(description = "Create a reusable component (sauce, bun, side) with per-100g macros and allergens")]
    fn add_component(&self, Parameters(p): Parameters<AddComponentParams>) -> Result<CallToolResult, McpError> {
        let data = ComponentCreate {
            name: p.name,
            kcal_per_100g: p.kcal_per_100g,
            protein_per_100g: p.protein_per_100g,
            carbs_per_100g: p.carbs_per_100g,
            fat_per_100g: p.fat_per_100g,
            allergens: p.allergens,
        };
        let result = components::add_component(&self.database, data).map_err(|e| McpError::internal_error(e, None))?;
        json_response(&result)
    }

    #[tool(description = "Get a component with its allergens and the number of dishes using it")]
    fn get_component(&self, Parameters(p): Parameters<ComponentIdParams>) -> Result<CallToolResult, McpError> {
        match components::get_component(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))? {
            Some(detail) => json_response(&detail),
            None => not_found("Component", p.id),
        }
    }

    #[tool(description = "List components, optionally filtered by name")]
    fn list_components(&self, Parameters(p): Parameters<ListComponentsParams>) -> Result<CallToolResult, McpError> {
        let result = components::list_components(&self.database, p.query.as_deref())
            .map_err(|e| McpError::internal_error(e, None))?;
        json_response(&result)
    }

    #[tool(description = "Delete a component (only allowed if no dish uses it)")]
    fn delete_component(&self, Parameters(p): Parameters<ComponentIdParams>) -> Result<CallToolResult, McpError> {
        match components::delete_component(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))? {
            Ok(success) => json_response(&success),
            Err(blocked) => json_response(&blocked),
        }
    }

    #[tool(description = "Add an allergen (returns the existing one if the name is taken)")]
    fn add_allergen(&self, Parameters(p): Parameters<AddAllergenParams>) -> Result<CallToolResult, McpError> {
        let result = components::add_allergen(&self.database, &p.name, p.severity_level.as_deref())
            .map_err(|e| McpError::internal_error(e, None))?;
        json_response(&result)
    }

    #[tool(description = "List all known allergens")]
    fn list_allergens(&self) -> Result<CallToolResult, McpError> {
        let result = components::list_allergens(&self.database).map_err(|e| McpError::internal_error(e, None))?;
        json_response(&result)
    }

    #[tool(description = "Set the components of a dish (replaces the current list). Returns component-based macros and the allergen union.")]
    fn set_dish_components(&self, Parameters(p): Parameters<SetDishComponentsParams>) -> Result<CallToolResult, McpError> {
        let inputs: Vec<DishComponentInput> = p
            .components
            .into_iter()
            .map(|c| DishComponentInput {
                component_id: c.component_id,
                amount: c.amount,
                is_optional: c.is_optional,
            })
            .collect();
        let result = components::set_dish_components(&self.database, p.dish_id, inputs)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_response(&result)
    }
}

#[tool_handler]
impl ServerHandler for MenutriService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "menutri".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("Menu Nutrition".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Menu Nutrition (menutri) - calories, macros and allergens for restaurant dishes. \
                 IMPORTANT: Call nutrition_instructions before building a dish. \
                 Nutrition: list_units, calculate_nutrition, scale_ingredient. \
                 Food database: search_food, get_food_profile. \
                 Dishes: create/get/list/update/delete_dish, save_dish_ingredients, recalculate_dish. \
                 Components: add/get/list/delete_component, set_dish_components. \
                 Allergens: add_allergen, list_allergens."
                    .into(),
            ),
        }
    }
}
