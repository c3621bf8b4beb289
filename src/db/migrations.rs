//! Database migrations
//!
//! Schema creation and migration logic.

use rusqlite::Connection;

use super::connection::DbResult;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 3;

/// Run all migrations to bring the database up to the current schema version
pub fn run_migrations(conn: &Connection) -> DbResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])?;
        tracing::info!("Applied schema migration v1");
    }

    if current_version < 2 {
        migrate_v2(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (2)", [])?;
        tracing::info!("Applied schema migration v2");
    }

    if current_version < 3 {
        migrate_v3(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (3)", [])?;
        tracing::info!("Applied schema migration v3");
    }

    Ok(())
}

/// Migration v1: dishes and their saved ingredients
fn migrate_v1(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- ============================================
        -- DISHES
        -- Menu items; nutrition is the last saved snapshot
        -- ============================================
        CREATE TABLE dishes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            restaurant_id INTEGER NOT NULL,      -- owned by the directory service
            name TEXT NOT NULL,
            description TEXT,
            price REAL NOT NULL DEFAULT 0 CHECK(price >= 0),
            image_url TEXT,
            is_available INTEGER NOT NULL DEFAULT 1,

            -- Nutrition snapshot (whole dish)
            base_kcal REAL,
            base_protein_g REAL,
            base_carbs_g REAL,
            base_fat_g REAL,
            base_fiber_g REAL,
            base_sugar_g REAL,

            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_dishes_restaurant ON dishes(restaurant_id);
        CREATE INDEX idx_dishes_name ON dishes(name);

        -- ============================================
        -- DISH INGREDIENTS
        -- Saved verbatim from the dish form, replaced wholesale
        -- ============================================
        CREATE TABLE dish_ingredients (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            dish_id INTEGER NOT NULL REFERENCES dishes(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            ingredient_key TEXT NOT NULL,        -- client-side ingredient id
            name TEXT NOT NULL,
            amount REAL NOT NULL,
            unit TEXT NOT NULL,
            source_id INTEGER,                   -- USDA FDC id

            UNIQUE(dish_id, position)
        );

        CREATE INDEX idx_dish_ingredients_dish ON dish_ingredients(dish_id);
        "#,
    )?;

    Ok(())
}

/// Migration v2: components and allergens
fn migrate_v2(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        -- ============================================
        -- ALLERGENS
        -- ============================================
        CREATE TABLE allergens (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE COLLATE NOCASE,
            severity_level TEXT
        );

        -- ============================================
        -- COMPONENTS
        -- Reusable building blocks, nutrition per 100g
        -- ============================================
        CREATE TABLE components (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            kcal_per_100g REAL NOT NULL CHECK(kcal_per_100g >= 0),
            protein_per_100g REAL NOT NULL CHECK(protein_per_100g >= 0),
            carbs_per_100g REAL NOT NULL CHECK(carbs_per_100g >= 0),
            fat_per_100g REAL NOT NULL CHECK(fat_per_100g >= 0),
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_components_name ON components(name);

        CREATE TABLE component_allergens (
            component_id INTEGER NOT NULL REFERENCES components(id) ON DELETE CASCADE,
            allergen_id INTEGER NOT NULL REFERENCES allergens(id) ON DELETE CASCADE,
            PRIMARY KEY (component_id, allergen_id)
        );

        -- ============================================
        -- DISH COMPONENTS
        -- amount is in grams
        -- ============================================
        CREATE TABLE dish_components (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            dish_id INTEGER NOT NULL REFERENCES dishes(id) ON DELETE CASCADE,
            component_id INTEGER NOT NULL REFERENCES components(id) ON DELETE RESTRICT,
            amount REAL NOT NULL CHECK(amount >= 0),
            is_optional INTEGER NOT NULL DEFAULT 0,

            UNIQUE(dish_id, component_id)
        );

        CREATE INDEX idx_dish_components_dish ON dish_components(dish_id);
        CREATE INDEX idx_dish_components_component ON dish_components(component_id);
        "#,
    )?;

    Ok(())
}

/// Migration v3: optional-field policy the nutrition snapshot was computed with
fn migrate_v3(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(
        r#"
        ALTER TABLE dishes ADD COLUMN nutrition_policy TEXT NOT NULL DEFAULT 'zero_fill'
            CHECK(nutrition_policy IN ('zero_fill', 'require_all'));
        "#,
    )?;

    Ok(())
}

/// Get the current schema version (0 for a fresh database)
pub fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

/// Check if the database needs migration
pub fn needs_migration(conn: &Connection) -> DbResult<bool> {
    let current = get_schema_version(conn)?;
    Ok(current < SCHEMA_VERSION)
}
