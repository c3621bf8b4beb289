//! Dish MCP Tools
//!
//! Dish CRUD plus saving ingredient lists with their nutrition snapshot.

use serde::Serialize;

use crate::db::Database;
use crate::draft::{DishDraft, ResolveFailure};
use crate::fooddb::FoodDatabase;
use crate::models::{
    dish_allergens, get_dish_components, Dish, DishComponentDetail, DishCreate, DishUpdate,
    NutritionTotals, SavedIngredient,
};
use crate::tools::nutrition::{parse_policy, validate_ingredients, DISPLAY_DECIMALS};

/// Summary of a dish for list results
#[derive(Debug, Serialize)]
pub struct DishSummary {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub is_available: bool,
    pub calories: Option<f64>,
}

impl From<&Dish> for DishSummary {
    fn from(dish: &Dish) -> Self {
        Self {
            id: dish.id,
            name: dish.name.clone(),
            price: dish.price,
            is_available: dish.is_available,
            calories: dish.nutrition.map(|n| n.calories),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListDishesResponse {
    pub restaurant_id: i64,
    pub dishes: Vec<DishSummary>,
    pub total: usize,
}

/// Full dish detail
#[derive(Debug, Serialize)]
pub struct DishDetail {
    #[serde(flatten)]
    pub dish: Dish,
    pub ingredients: Vec<SavedIngredient>,
    pub components: Vec<DishComponentDetail>,
    pub allergens: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteDishResponse {
    pub success: bool,
    pub deleted_id: i64,
}

/// Result of saving or recalculating a dish's ingredients
#[derive(Debug, Serialize)]
pub struct SaveIngredientsResponse {
    pub dish_id: i64,
    pub nutrition: NutritionTotals,
    pub ingredient_count: usize,
    /// Ingredients whose profile lookup failed
    pub unresolved: Vec<ResolveFailure>,
    /// Ingredients without a food database link
    pub unlinked: Vec<String>,
}

fn validate_dish_fields(name: Option<&str>, price: Option<f64>) -> Result<(), String> {
    if let Some(name) = name {
        if name.trim().is_empty() {
            return Err("Dish name cannot be empty".to_string());
        }
    }
    if let Some(price) = price {
        if !(price >= 0.0) {
            return Err("price cannot be negative".to_string());
        }
    }
    Ok(())
}

pub fn create_dish(db: &Database, mut data: DishCreate) -> Result<Dish, String> {
    validate_dish_fields(Some(&data.name), Some(data.price))?;
    data.name = data.name.trim().to_string();

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let dish = Dish::create(&conn, &data).map_err(|e| format!("Failed to create dish: {}", e))?;

    tracing::info!(dish_id = dish.id, restaurant_id = dish.restaurant_id, "Created dish");
    Ok(dish)
}

pub fn get_dish(db: &Database, id: i64) -> Result<Option<DishDetail>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let dish = match Dish::get_by_id(&conn, id).map_err(|e| format!("Failed to get dish: {}", e))? {
        Some(dish) => dish,
        None => return Ok(None),
    };

    let ingredients = Dish::get_ingredients(&conn, id)
        .map_err(|e| format!("Failed to get ingredients: {}", e))?;
    let components = get_dish_components(&conn, id)
        .map_err(|e| format!("Failed to get components: {}", e))?;
    let allergens = dish_allergens(&conn, id).map_err(|e| format!("Failed to get allergens: {}", e))?;

    Ok(Some(DishDetail {
        dish,
        ingredients,
        components,
        allergens,
    }))
}

pub fn list_dishes(db: &Database, restaurant_id: i64, available_only: bool) -> Result<ListDishesResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let dishes = Dish::list_for_restaurant(&conn, restaurant_id, available_only)
        .map_err(|e| format!("Failed to list dishes: {}", e))?;
    let summaries: Vec<DishSummary> = dishes.iter().map(DishSummary::from).collect();

    Ok(ListDishesResponse {
        restaurant_id,
        total: summaries.len(),
        dishes: summaries,
    })
}

pub fn update_dish(db: &Database, id: i64, data: DishUpdate) -> Result<Option<Dish>, String> {
    validate_dish_fields(data.name.as_deref(), data.price)?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    Dish::update(&conn, id, &data).map_err(|e| format!("Failed to update dish: {}", e))
}

pub fn delete_dish(db: &Database, id: i64) -> Result<DeleteDishResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let deleted = Dish::delete(&conn, id).map_err(|e| format!("Failed to delete dish: {}", e))?;
    if !deleted {
        return Err(format!("Dish not found: {}", id));
    }

    tracing::info!(dish_id = id, "Deleted dish");
    Ok(DeleteDishResponse {
        success: true,
        deleted_id: id,
    })
}

/// Resolve, total and store a dish's ingredient list
///
/// The list replaces any previously saved ingredients. The snapshot and the
/// ingredients are written in one transaction.
pub async fn save_dish_ingredients(
    db: &Database,
    food_db: &dyn FoodDatabase,
    dish_id: i64,
    ingredients: Vec<SavedIngredient>,
    policy: Option<&str>,
) -> Result<SaveIngredientsResponse, String> {
    let policy = parse_policy(policy)?;
    validate_ingredients(
        ingredients
            .iter()
            .map(|i| (i.name.as_str(), i.amount, i.unit.as_str())),
    )?;
    ensure_dish_exists(db, dish_id)?;

    let mut draft = DishDraft::new();
    for saved in ingredients {
        draft.add(saved.into());
    }

    let unresolved = draft.resolve(food_db).await;
    let nutrition = draft.totals_with(policy).rounded(DISPLAY_DECIMALS);
    let saved = draft.to_saved();

    db.with_transaction(|tx| {
        Dish::replace_ingredients(tx, dish_id, &saved)?;
        Dish::update_nutrition(tx, dish_id, Some(&nutrition), policy)
    })
    .map_err(|e| format!("Failed to save ingredients: {}", e))?;

    tracing::info!(
        dish_id,
        ingredients = saved.len(),
        unresolved = unresolved.len(),
        calories = nutrition.calories,
        "Saved dish ingredients"
    );

    Ok(SaveIngredientsResponse {
        dish_id,
        nutrition,
        ingredient_count: saved.len(),
        unlinked: draft
            .ingredients()
            .iter()
            .filter(|i| i.source_id.is_none())
            .map(|i| i.name.clone())
            .collect(),
        unresolved,
    })
}

/// Refetch profiles for the saved ingredients and rewrite the snapshot
///
/// Uses the optional-field policy the snapshot was saved with. Returns
/// `None` and leaves the snapshot untouched when no ingredients are saved.
pub async fn recalculate_dish(
    db: &Database,
    food_db: &dyn FoodDatabase,
    dish_id: i64,
) -> Result<Option<SaveIngredientsResponse>, String> {
    let (dish, saved) = {
        let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
        let dish = Dish::get_by_id(&conn, dish_id)
            .map_err(|e| format!("Failed to get dish: {}", e))?
            .ok_or_else(|| format!("Dish not found: {}", dish_id))?;
        let saved = Dish::get_ingredients(&conn, dish_id)
            .map_err(|e| format!("Failed to get ingredients: {}", e))?;
        (dish, saved)
    };

    if saved.is_empty() {
        tracing::debug!(dish_id, "No saved ingredients, skipping recalculation");
        return Ok(None);
    }

    save_dish_ingredients(db, food_db, dish_id, saved, Some(dish.nutrition_policy.as_str()))
        .await
        .map(Some)
}

fn ensure_dish_exists(db: &Database, dish_id: i64) -> Result<(), String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    match Dish::get_by_id(&conn, dish_id).map_err(|e| format!("Failed to get dish: {}", e))? {
        Some(_) => Ok(()),
        None => Err(format!("Dish not found: {}", dish_id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_database;
    use crate::fooddb::MemoryFoodDatabase;
    use crate::nutrition::OptionalFieldPolicy;

    fn dish_data(name: &str) -> DishCreate {
        DishCreate {
            restaurant_id: 7,
            name: name.to_string(),
            description: None,
            price: 14.0,
            image_url: None,
            is_available: true,
        }
    }

    fn saved(id: &str, name: &str, amount: f64, unit: &str, source_id: Option<u64>) -> SavedIngredient {
        SavedIngredient {
            id: id.to_string(),
            name: name.to_string(),
            amount,
            unit: unit.to_string(),
            source_id,
        }
    }

    #[test]
    fn test_create_dish_validation() {
        let db = test_database();
        assert!(create_dish(&db, dish_data("  ")).is_err());

        let mut negative = dish_data("Soup");
        negative.price = -1.0;
        assert!(create_dish(&db, negative).is_err());

        let dish = create_dish(&db, dish_data("  Soup ")).unwrap();
        assert_eq!(dish.name, "Soup");
        assert!(dish.nutrition.is_none());
    }

    #[test]
    fn test_list_and_delete() {
        let db = test_database();
        let a = create_dish(&db, dish_data("Bowl")).unwrap();
        create_dish(&db, dish_data("Salad")).unwrap();

        let listed = list_dishes(&db, 7, false).unwrap();
        assert_eq!(listed.total, 2);
        assert_eq!(list_dishes(&db, 8, false).unwrap().total, 0);

        assert!(delete_dish(&db, a.id).unwrap().success);
        assert!(delete_dish(&db, a.id).is_err());
        assert_eq!(list_dishes(&db, 7, false).unwrap().total, 1);
    }

    #[test]
    fn test_update_dish() {
        let db = test_database();
        let dish = create_dish(&db, dish_data("Bowl")).unwrap();

        let updated = update_dish(
            &db,
            dish.id,
            DishUpdate {
                price: Some(15.5),
                is_available: Some(false),
                ..Default::default()
            },
        )
        .unwrap()
        .unwrap();
        assert_eq!(updated.price, 15.5);
        assert!(!updated.is_available);

        assert!(update_dish(&db, 999, DishUpdate::default()).unwrap().is_none());
        assert!(update_dish(
            &db,
            dish.id,
            DishUpdate {
                name: Some(String::new()),
                ..Default::default()
            }
        )
        .is_err());
    }

    #[tokio::test]
    async fn test_save_dish_ingredients() {
        let db = test_database();
        let food_db = MemoryFoodDatabase::with_reference_foods();
        let dish = create_dish(&db, dish_data("Chicken rice")).unwrap();

        let response = save_dish_ingredients(
            &db,
            &food_db,
            dish.id,
            vec![
                saved("a", "Chicken", 200.0, "g", Some(171477)),
                saved("b", "Rice", 1.0, "cup", Some(169756)),
                saved("c", "Love", 1.0, "g", None),
            ],
            None,
        )
        .await
        .unwrap();

        assert_eq!(response.nutrition.calories, 642.0);
        assert_eq!(response.ingredient_count, 3);
        assert!(response.unresolved.is_empty());
        assert_eq!(response.unlinked, vec!["Love".to_string()]);

        let detail = get_dish(&db, dish.id).unwrap().unwrap();
        assert_eq!(detail.ingredients.len(), 3);
        assert_eq!(detail.ingredients[0].id, "a");
        assert_eq!(detail.dish.nutrition.map(|n| n.calories), Some(642.0));
    }

    #[tokio::test]
    async fn test_save_replaces_previous_list() {
        let db = test_database();
        let food_db = MemoryFoodDatabase::with_reference_foods();
        let dish = create_dish(&db, dish_data("Chicken")).unwrap();

        save_dish_ingredients(
            &db,
            &food_db,
            dish.id,
            vec![saved("a", "Chicken", 200.0, "g", Some(171477))],
            None,
        )
        .await
        .unwrap();
        let response = save_dish_ingredients(
            &db,
            &food_db,
            dish.id,
            vec![saved("a", "Chicken", 100.0, "g", Some(171477))],
            None,
        )
        .await
        .unwrap();

        assert_eq!(response.nutrition.calories, 165.0);
        let detail = get_dish(&db, dish.id).unwrap().unwrap();
        assert_eq!(detail.ingredients.len(), 1);
        assert_eq!(detail.ingredients[0].amount, 100.0);
    }

    #[tokio::test]
    async fn test_save_reports_failures_and_rejects_bad_units() {
        let db = test_database();
        let food_db = MemoryFoodDatabase::with_reference_foods();
        let dish = create_dish(&db, dish_data("Mystery")).unwrap();

        let response = save_dish_ingredients(
            &db,
            &food_db,
            dish.id,
            vec![saved("a", "Unknown food", 100.0, "g", Some(5))],
            None,
        )
        .await
        .unwrap();
        assert_eq!(response.unresolved.len(), 1);
        assert_eq!(response.nutrition.calories, 0.0);

        let err = save_dish_ingredients(
            &db,
            &food_db,
            dish.id,
            vec![saved("a", "Chicken", 1.0, "bucket", Some(171477))],
            None,
        )
        .await
        .unwrap_err();
        assert!(err.contains("bucket"));

        assert!(save_dish_ingredients(&db, &food_db, 999, Vec::new(), None).await.is_err());
    }

    #[tokio::test]
    async fn test_recalculate_dish_uses_current_profiles() {
        let db = test_database();
        let dish = create_dish(&db, dish_data("Rice")).unwrap();

        let before = MemoryFoodDatabase::new().with_food(
            1,
            "Rice",
            crate::models::NutritionProfile::macros(100.0, 2.0, 20.0, 0.0),
        );
        save_dish_ingredients(&db, &before, dish.id, vec![saved("a", "Rice", 200.0, "g", Some(1))], None)
            .await
            .unwrap();

        let after = MemoryFoodDatabase::new().with_food(
            1,
            "Rice",
            crate::models::NutritionProfile::macros(130.0, 2.7, 28.0, 0.3),
        );
        let response = recalculate_dish(&db, &after, dish.id).await.unwrap().unwrap();
        assert_eq!(response.nutrition.calories, 260.0);

        let detail = get_dish(&db, dish.id).unwrap().unwrap();
        assert_eq!(detail.dish.nutrition.map(|n| n.calories), Some(260.0));
    }

    #[tokio::test]
    async fn test_recalculate_dish_without_ingredients_keeps_snapshot_empty() {
        let db = test_database();
        let food_db = MemoryFoodDatabase::with_reference_foods();
        let dish = create_dish(&db, dish_data("Daily special")).unwrap();

        assert!(recalculate_dish(&db, &food_db, dish.id).await.unwrap().is_none());
        let detail = get_dish(&db, dish.id).unwrap().unwrap();
        assert!(detail.dish.nutrition.is_none());

        assert!(recalculate_dish(&db, &food_db, 999).await.is_err());
    }

    #[tokio::test]
    async fn test_recalculate_dish_keeps_saved_policy() {
        let db = test_database();
        let food_db = MemoryFoodDatabase::with_reference_foods();
        let dish = create_dish(&db, dish_data("Chicken rice")).unwrap();
        let ingredients = vec![
            saved("a", "Chicken", 200.0, "g", Some(171477)),
            saved("b", "Rice", 1.0, "cup", Some(169756)),
        ];

        let saved_response =
            save_dish_ingredients(&db, &food_db, dish.id, ingredients, Some("require_all"))
                .await
                .unwrap();
        assert_eq!(saved_response.nutrition.fiber, None);

        let recalculated = recalculate_dish(&db, &food_db, dish.id).await.unwrap().unwrap();
        assert_eq!(recalculated.nutrition.fiber, None);
        assert_eq!(recalculated.nutrition.calories, 642.0);

        let detail = get_dish(&db, dish.id).unwrap().unwrap();
        assert_eq!(detail.dish.nutrition_policy, OptionalFieldPolicy::RequireAll);
        assert_eq!(detail.dish.nutrition.and_then(|n| n.fiber), None);
    }
}
