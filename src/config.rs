//! Runtime configuration
//!
//! Read once from environment variables at startup.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::fooddb::UsdaConfig;

/// Which food database backs ingredient lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FoodDbKind {
    #[default]
    Usda,
    /// Built-in reference foods, no network
    Offline,
}

impl FoodDbKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "usda" | "fdc" => Some(Self::Usda),
            "offline" | "memory" => Some(Self::Offline),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Usda => "usda",
            Self::Offline => "offline",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub food_db: FoodDbKind,
    pub usda: UsdaConfig,
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = UsdaConfig::default();

        let food_db = match env::var("MENUTRI_FOOD_DB") {
            Ok(value) => FoodDbKind::parse(&value).unwrap_or_else(|| {
                tracing::warn!(value = %value, "Unknown MENUTRI_FOOD_DB, using usda");
                FoodDbKind::Usda
            }),
            Err(_) => FoodDbKind::default(),
        };

        let usda = UsdaConfig {
            api_key: env::var("MENUTRI_USDA_API_KEY").unwrap_or(defaults.api_key),
            base_url: env::var("MENUTRI_USDA_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            page_size: env_parse("MENUTRI_USDA_PAGE_SIZE")
                .map(|n: u32| n.clamp(1, 200))
                .unwrap_or(defaults.page_size),
            timeout: env_parse("MENUTRI_HTTP_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            cache_ttl: env_parse("MENUTRI_CACHE_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_ttl),
        };

        let config = Self {
            database_path: database_path_from_env(),
            food_db,
            usda,
        };

        tracing::info!(
            database = %config.database_path.display(),
            food_db = ?config.food_db,
            usda_base_url = %config.usda.base_url,
            page_size = config.usda.page_size,
            timeout_secs = config.usda.timeout.as_secs(),
            cache_ttl_secs = config.usda.cache_ttl.as_secs(),
            "Configuration loaded"
        );

        config
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let value = env::var(key).ok()?;
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            tracing::warn!(key, value = %value, "Ignoring unparsable setting");
            None
        }
    }
}

/// Database path from `MENUTRI_DATABASE_PATH`, else `data/menutri.db`
/// next to the project root
pub fn database_path_from_env() -> PathBuf {
    env::var("MENUTRI_DATABASE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_database_path())
}

fn default_database_path() -> PathBuf {
    let mut path = env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."));

    // target/{debug,release} -> project root
    if path.ends_with("release") || path.ends_with("debug") {
        if let Some(root) = path.parent().and_then(|p| p.parent()) {
            path = root.to_path_buf();
        }
    }

    path.push("data");
    path.push("menutri.db");
    path
}
