//! Menu Nutrition (menutri)
//!
//! An MCP server for restaurant dish nutrition and allergen data.

use std::sync::Arc;

use rmcp::ServiceExt;
use tokio::io::{stdin, stdout};
use tracing_subscriber::EnvFilter;

use menutri::build_info;
use menutri::config::{Config, FoodDbKind};
use menutri::db::{self, Database};
use menutri::fooddb::{FoodDatabase, MemoryFoodDatabase, UsdaClient};
use menutri::mcp::MenutriService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Log to stderr; stdout is the MCP transport
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("menutri=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    build_info::log_startup_banner();

    let config = Config::from_env();

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let database = Database::new(&config.database_path)?;
    database.with_conn(|conn| {
        db::migrations::run_migrations(conn)?;
        let version = db::migrations::get_schema_version(conn)?;
        tracing::info!(version, "Database schema ready");
        Ok(())
    })?;

    let food_db: Arc<dyn FoodDatabase> = match config.food_db {
        FoodDbKind::Usda => Arc::new(UsdaClient::new(config.usda.clone())?),
        FoodDbKind::Offline => {
            let memory = MemoryFoodDatabase::with_reference_foods();
            tracing::info!(foods = memory.len(), "Using offline food database");
            Arc::new(memory)
        }
    };
    let service = MenutriService::new(config.database_path.clone(), database, food_db, config.food_db.as_str());

    tracing::info!("Starting MCP server on stdio");
    let server = service.serve((stdin(), stdout())).await?;
    server.waiting().await?;

    Ok(())
}
