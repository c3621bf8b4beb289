//! Recalculate the stored nutrition of every dish
//! Usage: cargo run --bin recalculate_dishes -- [dish_id]

use menutri::config::{Config, FoodDbKind};
use menutri::db::{migrations, Database, DbError};
use menutri::fooddb::{FoodDatabase, MemoryFoodDatabase, UsdaClient};
use menutri::models::Dish;
use menutri::tools::dishes;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("menutri=warn".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let only: Option<i64> = match std::env::args().nth(1) {
        Some(arg) => Some(arg.parse().map_err(|_| format!("Invalid dish id: {}", arg))?),
        None => None,
    };

    let config = Config::from_env();
    println!("Database: {}", config.database_path.display());

    let database = Database::new(&config.database_path)?;
    let ids = database.with_conn(|conn| {
        migrations::run_migrations(conn)?;
        Ok::<_, DbError>(Dish::list_ids(conn)?)
    })?;
    let ids: Vec<i64> = ids.into_iter().filter(|id| only.map_or(true, |o| o == *id)).collect();

    let food_db: Box<dyn FoodDatabase> = match config.food_db {
        FoodDbKind::Usda => Box::new(UsdaClient::new(config.usda.clone())?),
        FoodDbKind::Offline => Box::new(MemoryFoodDatabase::with_reference_foods()),
    };

    println!("Recalculating {} dishes", ids.len());

    let mut failed = 0;
    for id in ids {
        match dishes::recalculate_dish(&database, food_db.as_ref(), id).await {
            Ok(None) => println!("  Dish {}: no saved ingredients, skipped", id),
            Ok(Some(result)) => {
                println!(
                    "  Dish {}: {:.1} kcal, {:.1} g protein, {:.1} g carbs, {:.1} g fat ({} ingredients, {} unresolved)",
                    id,
                    result.nutrition.calories,
                    result.nutrition.protein,
                    result.nutrition.carbs,
                    result.nutrition.fat,
                    result.ingredient_count,
                    result.unresolved.len()
                );
                for failure in &result.unresolved {
                    println!("    unresolved: {} (source {}): {}", failure.name, failure.source_id, failure.error);
                }
            }
            Err(e) => {
                failed += 1;
                eprintln!("  Dish {}: {}", id, e);
            }
        }
    }

    if failed > 0 {
        return Err(format!("{} dishes failed to recalculate", failed).into());
    }

    println!("Done");
    Ok(())
}
