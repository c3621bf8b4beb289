//! Dish model
//!
//! A menu item of a restaurant, its saved ingredient list and the nutrition
//! snapshot computed from those ingredients.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use super::{NutritionTotals, SavedIngredient};
use crate::db::{DbError, DbResult};
use crate::nutrition::OptionalFieldPolicy;

/// A dish on a restaurant menu
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dish {
    pub id: i64,
    pub restaurant_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub image_url: Option<String>,
    pub is_available: bool,
    /// `None` until nutrition has been saved for this dish
    pub nutrition: Option<NutritionTotals>,
    /// Optional-field policy the snapshot was computed with
    pub nutrition_policy: OptionalFieldPolicy,
    pub created_at: String,
    pub updated_at: String,
}

/// Data for creating a new dish
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DishCreate {
    pub restaurant_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub image_url: Option<String>,
    #[serde(default = "default_available")]
    pub is_available: bool,
}

fn default_available() -> bool {
    true
}

/// Data for updating a dish
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DishUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub image_url: Option<String>,
    pub is_available: Option<bool>,
}

impl Dish {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let kcal: Option<f64> = row.get("base_kcal")?;
        let nutrition = match kcal {
            Some(calories) => Some(NutritionTotals {
                calories,
                protein: row.get::<_, Option<f64>>("base_protein_g")?.unwrap_or(0.0),
                carbs: row.get::<_, Option<f64>>("base_carbs_g")?.unwrap_or(0.0),
                fat: row.get::<_, Option<f64>>("base_fat_g")?.unwrap_or(0.0),
                fiber: row.get("base_fiber_g")?,
                sugar: row.get("base_sugar_g")?,
            }),
            None => None,
        };
        let nutrition_policy: OptionalFieldPolicy = row
            .get::<_, String>("nutrition_policy")?
            .parse()
            .unwrap_or_default();

        Ok(Self {
            id: row.get("id")?,
            restaurant_id: row.get("restaurant_id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            price: row.get("price")?,
            image_url: row.get("image_url")?,
            is_available: row.get::<_, i64>("is_available")? != 0,
            nutrition,
            nutrition_policy,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Insert a new dish
    pub fn create(conn: &Connection, data: &DishCreate) -> DbResult<Self> {
        conn.execute(
            r#"
            INSERT INTO dishes (restaurant_id, name, description, price, image_url, is_available)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                data.restaurant_id,
                data.name,
                data.description,
                data.price,
                data.image_url,
                data.is_available as i64,
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?.ok_or(DbError::NotFound { entity: "Dish", id })
    }

    /// Get a dish by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM dishes WHERE id = ?1")?;

        match stmt.query_row([id], Self::from_row) {
            Ok(dish) => Ok(Some(dish)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List the dishes of one restaurant, by name
    pub fn list_for_restaurant(
        conn: &Connection,
        restaurant_id: i64,
        available_only: bool,
    ) -> DbResult<Vec<Self>> {
        let sql = if available_only {
            "SELECT * FROM dishes WHERE restaurant_id = ?1 AND is_available = 1 ORDER BY name ASC"
        } else {
            "SELECT * FROM dishes WHERE restaurant_id = ?1 ORDER BY name ASC"
        };
        let mut stmt = conn.prepare(sql)?;
        let dishes = stmt
            .query_map([restaurant_id], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(dishes)
    }

    /// All dish ids (used by bulk recalculation)
    pub fn list_ids(conn: &Connection) -> DbResult<Vec<i64>> {
        let mut stmt = conn.prepare("SELECT id FROM dishes ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    /// Update dish metadata
    pub fn update(conn: &Connection, id: i64, data: &DishUpdate) -> DbResult<Option<Self>> {
        let mut updates = Vec::new();
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        macro_rules! add_update {
            ($field:ident, $col:expr) => {
                if let Some(ref val) = data.$field {
                    updates.push(format!("{} = ?{}", $col, params_vec.len() + 1));
                    params_vec.push(Box::new(val.clone()));
                }
            };
        }

        add_update!(name, "name");
        add_update!(description, "description");
        add_update!(price, "price");
        add_update!(image_url, "image_url");

        if let Some(available) = data.is_available {
            updates.push(format!("is_available = ?{}", params_vec.len() + 1));
            params_vec.push(Box::new(available as i64));
        }

        if updates.is_empty() {
            return Self::get_by_id(conn, id);
        }

        updates.push("updated_at = datetime('now')".to_string());

        let sql = format!(
            "UPDATE dishes SET {} WHERE id = ?{}",
            updates.join(", "),
            params_vec.len() + 1
        );
        params_vec.push(Box::new(id));

        let params_refs: Vec<&dyn rusqlite::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, params_refs.as_slice())?;

        Self::get_by_id(conn, id)
    }

    /// Store a nutrition snapshot (or clear it with `None`) with its policy
    pub fn update_nutrition(
        conn: &Connection,
        id: i64,
        totals: Option<&NutritionTotals>,
        policy: OptionalFieldPolicy,
    ) -> DbResult<()> {
        let rows = conn.execute(
            r#"
            UPDATE dishes SET
                base_kcal = ?1, base_protein_g = ?2, base_carbs_g = ?3, base_fat_g = ?4,
                base_fiber_g = ?5, base_sugar_g = ?6, nutrition_policy = ?7,
                updated_at = datetime('now')
            WHERE id = ?8
            "#,
            params![
                totals.map(|t| t.calories),
                totals.map(|t| t.protein),
                totals.map(|t| t.carbs),
                totals.map(|t| t.fat),
                totals.and_then(|t| t.fiber),
                totals.and_then(|t| t.sugar),
                policy.as_str(),
                id,
            ],
        )?;
        if rows == 0 {
            return Err(DbError::NotFound { entity: "Dish", id });
        }
        Ok(())
    }

    /// Saved ingredients in form order
    pub fn get_ingredients(conn: &Connection, dish_id: i64) -> DbResult<Vec<SavedIngredient>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT ingredient_key, name, amount, unit, source_id
            FROM dish_ingredients
            WHERE dish_id = ?1
            ORDER BY position
            "#,
        )?;

        let ingredients = stmt
            .query_map([dish_id], |row| {
                Ok(SavedIngredient {
                    id: row.get("ingredient_key")?,
                    name: row.get("name")?,
                    amount: row.get("amount")?,
                    unit: row.get("unit")?,
                    source_id: row
                        .get::<_, Option<i64>>("source_id")?
                        .map(|v| v as u64),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ingredients)
    }

    /// Replace the saved ingredient list wholesale
    pub fn replace_ingredients(conn: &Connection, dish_id: i64, ingredients: &[SavedIngredient]) -> DbResult<()> {
        if Self::get_by_id(conn, dish_id)?.is_none() {
            return Err(DbError::NotFound { entity: "Dish", id: dish_id });
        }

        conn.execute("DELETE FROM dish_ingredients WHERE dish_id = ?1", [dish_id])?;

        let mut stmt = conn.prepare(
            r#"
            INSERT INTO dish_ingredients (dish_id, position, ingredient_key, name, amount, unit, source_id)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )?;
        for (position, ing) in ingredients.iter().enumerate() {
            stmt.execute(params![
                dish_id,
                position as i64,
                ing.id,
                ing.name,
                ing.amount,
                ing.unit,
                ing.source_id.map(|v| v as i64),
            ])?;
        }

        Ok(())
    }

    /// Delete a dish (ingredients and component links cascade)
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM dishes WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}
