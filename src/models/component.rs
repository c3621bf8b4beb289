//! Component and allergen models
//!
//! Components are reusable per-100g building blocks (a sauce, a bun, a patty)
//! that carry allergens. A dish lists components with gram amounts.

use std::collections::BTreeSet;

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use super::{Ingredient, NutritionProfile, NutritionTotals};
use crate::db::{DbError, DbResult};
use crate::nutrition::{aggregate_with, OptionalFieldPolicy};

/// A named allergen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allergen {
    pub id: i64,
    pub name: String,
    pub severity_level: Option<String>,
}

/// A reusable dish building block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    pub id: i64,
    pub name: String,
    pub nutrition: NutritionProfile,
    pub allergens: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCreate {
    pub name: String,
    pub kcal_per_100g: f64,
    pub protein_per_100g: f64,
    pub carbs_per_100g: f64,
    pub fat_per_100g: f64,
    #[serde(default)]
    pub allergens: Vec<String>,
}

/// A component as used by a dish
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DishComponentInput {
    pub component_id: i64,
    /// grams
    pub amount: f64,
    #[serde(default)]
    pub is_optional: bool,
}

/// A dish component joined with its component name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DishComponentDetail {
    pub component_id: i64,
    pub component_name: String,
    pub amount: f64,
    pub is_optional: bool,
}

impl Allergen {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            severity_level: row.get("severity_level")?,
        })
    }

    /// Insert an allergen, or return the existing one with the same name
    pub fn get_or_create(conn: &Connection, name: &str, severity_level: Option<&str>) -> DbResult<Self> {
        conn.execute(
            "INSERT OR IGNORE INTO allergens (name, severity_level) VALUES (?1, ?2)",
            params![name, severity_level],
        )?;
        let allergen = conn.query_row(
            "SELECT * FROM allergens WHERE name = ?1",
            [name],
            Self::from_row,
        )?;
        Ok(allergen)
    }

    pub fn list(conn: &Connection) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM allergens ORDER BY name COLLATE NOCASE")?;
        let allergens = stmt
            .query_map([], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(allergens)
    }
}

impl Component {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            nutrition: NutritionProfile::macros(
                row.get("kcal_per_100g")?,
                row.get("protein_per_100g")?,
                row.get("carbs_per_100g")?,
                row.get("fat_per_100g")?,
            ),
            allergens: Vec::new(),
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Insert a component together with its allergens
    pub fn create(conn: &Connection, data: &ComponentCreate) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO components (name, kcal_per_100g, protein_per_100g, carbs_per_100g, fat_per_100g)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                data.name,
                data.kcal_per_100g,
                data.protein_per_100g,
                data.carbs_per_100g,
                data.fat_per_100g,
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::set_allergens(conn, id, &data.allergens)?;
        Self::get_by_id(conn, id)?.ok_or(DbError::NotFound { entity: "Component", id })
    }

    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM components WHERE id = ?1")?;
        let component = match stmt.query_row([id], Self::from_row) {
            Ok(c) => c,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(Self::with_allergens(conn, component)?))
    }

    /// List components, optionally filtered by a name fragment
    pub fn list(conn: &Connection, query: Option<&str>) -> DbResult<Vec<Self>> {
        let pattern = format!("%{}%", query.unwrap_or(""));
        let mut stmt = conn.prepare("SELECT * FROM components WHERE name LIKE ?1 ORDER BY name ASC")?;
        let components = stmt
            .query_map([&pattern], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        components
            .into_iter()
            .map(|c| Self::with_allergens(conn, c))
            .collect()
    }

    fn with_allergens(conn: &Connection, mut component: Self) -> DbResult<Self> {
        component.allergens = Self::get_allergens(conn, component.id)?
            .into_iter()
            .map(|a| a.name)
            .collect();
        Ok(component)
    }

    pub fn get_allergens(conn: &Connection, component_id: i64) -> DbResult<Vec<Allergen>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT a.* FROM allergens a
            INNER JOIN component_allergens ca ON a.id = ca.allergen_id
            WHERE ca.component_id = ?1
            ORDER BY a.name COLLATE NOCASE
            "#,
        )?;
        let allergens = stmt
            .query_map([component_id], Allergen::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(allergens)
    }

    /// Replace the allergens of a component, creating unknown names
    pub fn set_allergens(conn: &Connection, component_id: i64, names: &[String]) -> DbResult<()> {
        conn.execute(
            "DELETE FROM component_allergens WHERE component_id = ?1",
            [component_id],
        )?;
        for name in names {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let allergen = Allergen::get_or_create(conn, name, None)?;
            conn.execute(
                "INSERT OR IGNORE INTO component_allergens (component_id, allergen_id) VALUES (?1, ?2)",
                params![component_id, allergen.id],
            )?;
        }
        Ok(())
    }

    /// Number of dishes using this component
    pub fn get_usage_count(conn: &Connection, id: i64) -> DbResult<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM dish_components WHERE component_id = ?1",
            [id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Delete a component (fails with a constraint error while dishes use it)
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM components WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}

/// Replace the component list of a dish
pub fn set_dish_components(conn: &Connection, dish_id: i64, components: &[DishComponentInput]) -> DbResult<()> {
    conn.execute("DELETE FROM dish_components WHERE dish_id = ?1", [dish_id])?;
    for c in components {
        if Component::get_by_id(conn, c.component_id)?.is_none() {
            return Err(DbError::NotFound { entity: "Component", id: c.component_id });
        }
        conn.execute(
            r#"
            INSERT INTO dish_components (dish_id, component_id, amount, is_optional)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![dish_id, c.component_id, c.amount, c.is_optional as i64],
        )?;
    }
    Ok(())
}

pub fn get_dish_components(conn: &Connection, dish_id: i64) -> DbResult<Vec<DishComponentDetail>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT dc.component_id, c.name AS component_name, dc.amount, dc.is_optional
        FROM dish_components dc
        INNER JOIN components c ON c.id = dc.component_id
        WHERE dc.dish_id = ?1
        ORDER BY dc.id
        "#,
    )?;
    let details = stmt
        .query_map([dish_id], |row| {
            Ok(DishComponentDetail {
                component_id: row.get("component_id")?,
                component_name: row.get("component_name")?,
                amount: row.get("amount")?,
                is_optional: row.get::<_, i64>("is_optional")? != 0,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(details)
}

/// Dish macros from its components (every listed component counts)
pub fn calculate_component_nutrition(conn: &Connection, dish_id: i64) -> DbResult<NutritionTotals> {
    let mut ingredients = Vec::new();
    for dc in get_dish_components(conn, dish_id)? {
        let component = Component::get_by_id(conn, dc.component_id)?
            .ok_or(DbError::NotFound { entity: "Component", id: dc.component_id })?;
        ingredients.push(
            Ingredient::new(format!("component-{}", component.id), component.name, dc.amount, "g")
                .with_nutrition(component.nutrition),
        );
    }

    // Components carry no fiber/sugar, so those totals stay unknown
    Ok(aggregate_with(&ingredients, OptionalFieldPolicy::RequireAll))
}

/// Union of the allergens of every component of a dish, sorted
pub fn dish_allergens(conn: &Connection, dish_id: i64) -> DbResult<Vec<String>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT DISTINCT a.name FROM allergens a
        INNER JOIN component_allergens ca ON a.id = ca.allergen_id
        INNER JOIN dish_components dc ON dc.component_id = ca.component_id
        WHERE dc.dish_id = ?1
        "#,
    )?;
    let names: BTreeSet<String> = stmt
        .query_map([dish_id], |row| row.get(0))?
        .collect::<Result<_, _>>()?;
    Ok(names.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_database;
    use crate::models::{Dish, DishCreate};

    fn component(conn: &Connection, name: &str, kcal: f64, allergens: &[&str]) -> Component {
        Component::create(
            conn,
            &ComponentCreate {
                name: name.to_string(),
                kcal_per_100g: kcal,
                protein_per_100g: 10.0,
                carbs_per_100g: 20.0,
                fat_per_100g: 5.0,
                allergens: allergens.iter().map(|s| s.to_string()).collect(),
            },
        )
        .unwrap()
    }

    fn dish(conn: &Connection) -> Dish {
        Dish::create(
            conn,
            &DishCreate {
                restaurant_id: 1,
                name: "Burger".to_string(),
                description: None,
                price: 9.0,
                image_url: None,
                is_available: true,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_component_with_allergens() {
        let db = test_database();
        let conn = db.get_conn().unwrap();
        let bun = component(&conn, "Brioche bun", 300.0, &["Wheat", "Eggs", "Milk"]);
        assert_eq!(bun.allergens, vec!["Eggs", "Milk", "Wheat"]);
        assert_eq!(bun.nutrition.calories_per_100g, 300.0);

        let listed = Component::list(&conn, Some("brioche")).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].allergens.len(), 3);
    }

    #[test]
    fn test_allergen_names_are_unique_case_insensitive() {
        let db = test_database();
        let conn = db.get_conn().unwrap();
        let a = Allergen::get_or_create(&conn, "Peanuts", Some("high")).unwrap();
        let b = Allergen::get_or_create(&conn, "peanuts", None).unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(Allergen::list(&conn).unwrap().len(), 1);
    }

    #[test]
    fn test_component_nutrition_and_allergen_union() {
        let db = test_database();
        let conn = db.get_conn().unwrap();
        let bun = component(&conn, "Bun", 300.0, &["Wheat", "Sesame"]);
        let patty = component(&conn, "Patty", 250.0, &[]);
        let sauce = component(&conn, "Sauce", 400.0, &["Eggs", "Mustard", "Wheat"]);
        let d = dish(&conn);

        set_dish_components(
            &conn,
            d.id,
            &[
                DishComponentInput { component_id: bun.id, amount: 80.0, is_optional: false },
                DishComponentInput { component_id: patty.id, amount: 150.0, is_optional: false },
                DishComponentInput { component_id: sauce.id, amount: 20.0, is_optional: true },
            ],
        )
        .unwrap();

        let totals = calculate_component_nutrition(&conn, d.id).unwrap();
        // 300*0.8 + 250*1.5 + 400*0.2
        assert!((totals.calories - 695.0).abs() < 1e-9);
        assert!((totals.protein - 25.0).abs() < 1e-9);
        assert_eq!(totals.fiber, None);

        let allergens = dish_allergens(&conn, d.id).unwrap();
        assert_eq!(allergens, vec!["Eggs", "Mustard", "Sesame", "Wheat"]);

        let details = get_dish_components(&conn, d.id).unwrap();
        assert_eq!(details.len(), 3);
        assert!(details[2].is_optional);
    }

    #[test]
    fn test_unknown_component_rejected() {
        let db = test_database();
        let conn = db.get_conn().unwrap();
        let d = dish(&conn);
        let result = set_dish_components(
            &conn,
            d.id,
            &[DishComponentInput { component_id: 77, amount: 10.0, is_optional: false }],
        );
        assert!(matches!(result, Err(DbError::NotFound { entity: "Component", id: 77 })));
    }

    #[test]
    fn test_component_in_use_cannot_be_deleted() {
        let db = test_database();
        let conn = db.get_conn().unwrap();
        let bun = component(&conn, "Bun", 300.0, &[]);
        let d = dish(&conn);
        set_dish_components(&conn, d.id, &[DishComponentInput { component_id: bun.id, amount: 80.0, is_optional: false }]).unwrap();

        assert_eq!(Component::get_usage_count(&conn, bun.id).unwrap(), 1);
        assert!(Component::delete(&conn, bun.id).is_err());
    }
}
