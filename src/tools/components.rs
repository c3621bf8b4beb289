//! Component and Allergen MCP Tools
//!
//! Reusable dish components, the allergen list, and component assignment
//! to dishes.

use serde::Serialize;

use crate::db::Database;
use crate::models::{
    calculate_component_nutrition, dish_allergens, get_dish_components, set_dish_components as store_dish_components,
    Allergen, Component, ComponentCreate, Dish, DishComponentDetail, DishComponentInput, NutritionTotals,
};
use crate::tools::nutrition::DISPLAY_DECIMALS;

#[derive(Debug, Serialize)]
pub struct ComponentDetail {
    #[serde(flatten)]
    pub component: Component,
    pub usage_count: i64,
}

#[derive(Debug, Serialize)]
pub struct ListComponentsResponse {
    pub components: Vec<Component>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct DeleteComponentSuccessResponse {
    pub success: bool,
    pub deleted_id: i64,
}

#[derive(Debug, Serialize)]
pub struct DeleteComponentBlockedResponse {
    pub error: String,
    pub usage_count: i64,
}

#[derive(Debug, Serialize)]
pub struct ListAllergensResponse {
    pub allergens: Vec<Allergen>,
    pub total: usize,
}

/// Components of a dish with the values derived from them
#[derive(Debug, Serialize)]
pub struct DishComponentsResponse {
    pub dish_id: i64,
    pub components: Vec<DishComponentDetail>,
    pub nutrition: NutritionTotals,
    pub allergens: Vec<String>,
}

pub fn add_component(db: &Database, mut data: ComponentCreate) -> Result<Component, String> {
    data.name = data.name.trim().to_string();
    if data.name.is_empty() {
        return Err("Component name cannot be empty".to_string());
    }

    for (field, value) in [
        ("kcal_per_100g", data.kcal_per_100g),
        ("protein_per_100g", data.protein_per_100g),
        ("carbs_per_100g", data.carbs_per_100g),
        ("fat_per_100g", data.fat_per_100g),
    ] {
        if !(value >= 0.0) {
            return Err(format!("{} cannot be negative", field));
        }
    }

    let created = db
        .with_transaction(|tx| Component::create(tx, &data))
        .map_err(|e| format!("Failed to create component: {}", e))?;

    tracing::info!(component_id = created.id, name = %created.name, "Created component");
    Ok(created)
}

pub fn get_component(db: &Database, id: i64) -> Result<Option<ComponentDetail>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    match Component::get_by_id(&conn, id).map_err(|e| format!("Failed to get component: {}", e))? {
        Some(component) => {
            let usage_count = Component::get_usage_count(&conn, id)
                .map_err(|e| format!("Failed to get usage count: {}", e))?;
            Ok(Some(ComponentDetail {
                component,
                usage_count,
            }))
        }
        None => Ok(None),
    }
}

pub fn list_components(db: &Database, query: Option<&str>) -> Result<ListComponentsResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let components = Component::list(&conn, query.map(str::trim))
        .map_err(|e| format!("Failed to list components: {}", e))?;

    Ok(ListComponentsResponse {
        total: components.len(),
        components,
    })
}

/// Delete a component that no dish uses
pub fn delete_component(
    db: &Database,
    id: i64,
) -> Result<Result<DeleteComponentSuccessResponse, DeleteComponentBlockedResponse>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let usage_count = Component::get_usage_count(&conn, id)
        .map_err(|e| format!("Failed to get usage count: {}", e))?;
    if usage_count > 0 {
        return Ok(Err(DeleteComponentBlockedResponse {
            error: "Cannot delete component that is used by dishes".to_string(),
            usage_count,
        }));
    }

    let deleted = Component::delete(&conn, id).map_err(|e| format!("Failed to delete component: {}", e))?;
    if !deleted {
        return Err(format!("Component not found: {}", id));
    }

    Ok(Ok(DeleteComponentSuccessResponse {
        success: true,
        deleted_id: id,
    }))
}

pub fn add_allergen(db: &Database, name: &str, severity_level: Option<&str>) -> Result<Allergen, String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("Allergen name cannot be empty".to_string());
    }

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    Allergen::get_or_create(&conn, name, severity_level).map_err(|e| format!("Failed to add allergen: {}", e))
}

pub fn list_allergens(db: &Database) -> Result<ListAllergensResponse, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let allergens = Allergen::list(&conn).map_err(|e| format!("Failed to list allergens: {}", e))?;

    Ok(ListAllergensResponse {
        total: allergens.len(),
        allergens,
    })
}

/// Replace the components of a dish and report the derived values
pub fn set_dish_components(
    db: &Database,
    dish_id: i64,
    components: Vec<DishComponentInput>,
) -> Result<DishComponentsResponse, String> {
    if let Some(bad) = components.iter().find(|c| !(c.amount > 0.0)) {
        return Err(format!(
            "Component {} amount must be greater than 0, got {}",
            bad.component_id, bad.amount
        ));
    }

    db.with_transaction(|tx| {
        if Dish::get_by_id(tx, dish_id)?.is_none() {
            return Err(crate::db::DbError::NotFound { entity: "Dish", id: dish_id });
        }
        store_dish_components(tx, dish_id, &components)?;

        Ok(DishComponentsResponse {
            dish_id,
            components: get_dish_components(tx, dish_id)?,
            nutrition: calculate_component_nutrition(tx, dish_id)?.rounded(DISPLAY_DECIMALS),
            allergens: dish_allergens(tx, dish_id)?,
        })
    })
    .map_err(|e| format!("Failed to set dish components: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_database;
    use crate::models::DishCreate;

    fn component_data(name: &str, kcal: f64, allergens: &[&str]) -> ComponentCreate {
        ComponentCreate {
            name: name.to_string(),
            kcal_per_100g: kcal,
            protein_per_100g: 10.0,
            carbs_per_100g: 20.0,
            fat_per_100g: 5.0,
            allergens: allergens.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn dish(db: &Database) -> Dish {
        let conn = db.get_conn().unwrap();
        Dish::create(
            &conn,
            &DishCreate {
                restaurant_id: 1,
                name: "Burger".to_string(),
                description: None,
                price: 11.0,
                image_url: None,
                is_available: true,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_add_component_validation() {
        let db = test_database();
        assert!(add_component(&db, component_data(" ", 100.0, &[])).is_err());
        assert!(add_component(&db, component_data("Bun", -1.0, &[])).is_err());

        let bun = add_component(&db, component_data("Bun", 265.0, &["Gluten"])).unwrap();
        assert_eq!(bun.allergens, vec!["Gluten".to_string()]);
        assert_eq!(list_allergens(&db).unwrap().total, 1);
    }

    #[test]
    fn test_add_allergen_is_idempotent() {
        let db = test_database();
        let first = add_allergen(&db, "Peanuts", Some("severe")).unwrap();
        let second = add_allergen(&db, " peanuts ", None).unwrap();
        assert_eq!(first.id, second.id);
        assert!(add_allergen(&db, "", None).is_err());
    }

    #[test]
    fn test_set_dish_components() {
        let db = test_database();
        let burger = dish(&db);
        let bun = add_component(&db, component_data("Bun", 265.0, &["Gluten", "Sesame"])).unwrap();
        let sauce = add_component(&db, component_data("Sauce", 400.0, &["Egg", "Gluten"])).unwrap();

        let response = set_dish_components(
            &db,
            burger.id,
            vec![
                DishComponentInput { component_id: bun.id, amount: 80.0, is_optional: false },
                DishComponentInput { component_id: sauce.id, amount: 20.0, is_optional: true },
            ],
        )
        .unwrap();

        assert_eq!(response.components.len(), 2);
        assert_eq!(response.nutrition.calories, 292.0);
        assert_eq!(response.nutrition.protein, 10.0);
        assert_eq!(response.allergens, vec!["Egg", "Gluten", "Sesame"]);

        let detail = get_component(&db, bun.id).unwrap().unwrap();
        assert_eq!(detail.usage_count, 1);
        assert!(delete_component(&db, bun.id).unwrap().is_err());
    }

    #[test]
    fn test_set_dish_components_rejects_bad_input() {
        let db = test_database();
        let burger = dish(&db);
        let bun = add_component(&db, component_data("Bun", 265.0, &[])).unwrap();

        assert!(set_dish_components(
            &db,
            burger.id,
            vec![DishComponentInput { component_id: bun.id, amount: 0.0, is_optional: false }],
        )
        .is_err());
        assert!(set_dish_components(
            &db,
            burger.id,
            vec![DishComponentInput { component_id: 999, amount: 10.0, is_optional: false }],
        )
        .is_err());
        assert!(set_dish_components(&db, 999, Vec::new()).is_err());
    }

    #[test]
    fn test_delete_unused_component() {
        let db = test_database();
        let bun = add_component(&db, component_data("Bun", 265.0, &[])).unwrap();

        assert!(delete_component(&db, bun.id).unwrap().unwrap().success);
        assert!(get_component(&db, bun.id).unwrap().is_none());
        assert!(delete_component(&db, bun.id).is_err());
        assert_eq!(list_components(&db, None).unwrap().total, 0);
    }
}
