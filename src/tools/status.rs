//! Status Tool
//!
//! Runtime status of the menutri service plus the usage guide served to
//! assistants.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::build_info::BuildInfo;

/// Dish nutrition workflow for AI assistants
pub const NUTRITION_INSTRUCTIONS: &str = r#"
# Menutri Dish Nutrition Instructions

Menutri computes calories and macros for restaurant dishes from their
ingredients, and tracks allergens through reusable components.

## Nutrition model

- Every food carries a **profile per 100 g**: calories, protein, carbs, fat,
  and optionally fiber and sugar.
- An ingredient is `name + amount + unit`, optionally linked to a food
  database id (`source_id`, a USDA FoodData Central fdcId).
- Ingredient nutrition = profile × grams / 100.
- Dish nutrition = sum over all ingredients. Ingredients without a profile
  contribute zero.

## Units

Call `list_units` for the full table. Volumes are converted with the density
of water:

| Unit | Grams |
|------|-------|
| g | 1 |
| kg | 1000 |
| oz | 28.35 |
| lb | 453.592 |
| ml | 1 |
| l | 1000 |
| cup | 240 |
| tbsp | 15 |
| tsp | 5 |

Unknown units are rejected by the tools. Use one of the codes above.

## Workflow: new dish

1. `create_dish` with `restaurant_id`, `name`, and optionally price and
   description.
2. For every ingredient, `search_food` with a plain name ("chicken breast
   roasted", "white rice cooked"). Prefer Foundation and SR Legacy hits.
3. Optionally `get_food_profile` to check the per-100g values.
4. `save_dish_ingredients` with the full ingredient list. Each entry:
   `{ "name": "...", "amount": 200, "unit": "g", "source_id": 171477 }`.
   Profiles are fetched, totals computed and stored on the dish. The list
   replaces any previously saved ingredients.
5. Check the response for `unresolved` entries. Those ingredients count as
   zero until fixed.

## Quick calculations

- `calculate_nutrition` aggregates an ad-hoc ingredient list with inline
  profiles, without touching the database.
- `scale_ingredient` scales one profile to an amount and unit.

Both accept `optional_fields`: `zero_fill` (default, missing fiber/sugar
count as 0) or `require_all` (fiber/sugar reported only when every
ingredient has them).

## Components and allergens

Components are reusable building blocks (sauces, doughs, sides) with a
per-100g profile and an allergen list.

1. `add_allergen` for anything not in `list_allergens` yet.
2. `add_component` with per-100g values and allergen names.
3. `set_dish_components` with `{ "component_id", "amount" (grams),
   "is_optional" }` entries. Replaces the previous set. The response carries
   the component-based macros and the allergen union of the dish.

Components in use by a dish cannot be deleted.

## Maintenance

- `recalculate_dish` refetches profiles for a dish's saved ingredients and
  rewrites its stored nutrition.
- The `recalculate_dishes` binary does the same for every dish.
"#;

/// Runtime status of the menutri service
#[derive(Debug, Clone, Serialize)]
pub struct MenutriStatus {
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub version: &'static str,

    pub database_path: String,
    pub database_size_bytes: Option<u64>,
    pub food_database: String,

    pub started_at: String,
    pub uptime_seconds: u64,
    pub process_id: u32,
    pub memory_usage_bytes: u64,
}

/// Status tracker for collecting runtime information
pub struct StatusTracker {
    start_time: Instant,
    started_at: String,
    database_path: PathBuf,
    food_database: String,
}

impl StatusTracker {
    pub fn new(database_path: PathBuf, food_database: impl Into<String>) -> Self {
        Self {
            start_time: Instant::now(),
            started_at: chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            database_path,
            food_database: food_database.into(),
        }
    }

    pub fn get_status(&self) -> MenutriStatus {
        let build_info = BuildInfo::current();

        let database_size_bytes = std::fs::metadata(&self.database_path)
            .ok()
            .map(|m| m.len());

        let pid = std::process::id();
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]));

        let memory_usage_bytes = sys
            .process(Pid::from_u32(pid))
            .map(|p| p.memory())
            .unwrap_or(0);

        MenutriStatus {
            build_number: build_info.build_number,
            build_timestamp: build_info.build_timestamp,
            version: build_info.version,
            database_path: self.database_path.display().to_string(),
            database_size_bytes,
            food_database: self.food_database.clone(),
            started_at: self.started_at.clone(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: pid,
            memory_usage_bytes,
        }
    }
}
