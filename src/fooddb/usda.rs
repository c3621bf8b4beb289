//! USDA FoodData Central client
//!
//! Search: `GET {base}/foods/search`, details: `GET {base}/food/{fdcId}`.
//! Nutrient amounts in the details response are per 100 g.
//! API reference: <https://fdc.nal.usda.gov/api-guide.html>

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;

use super::{FoodDatabase, FoodDbError, FoodSearchResult};
use crate::models::NutritionProfile;

pub const DEFAULT_BASE_URL: &str = "https://api.nal.usda.gov/fdc/v1";
pub const DEMO_API_KEY: &str = "DEMO_KEY";

/// Data types with analytical (non-branded) values
const SEARCH_DATA_TYPES: [&str; 3] = ["Survey (FNDDS)", "Foundation", "SR Legacy"];

// USDA nutrient ids
const NUTRIENT_ENERGY_KCAL: u32 = 1008;
const NUTRIENT_ENERGY_ATWATER_GENERAL: u32 = 2047;
const NUTRIENT_ENERGY_ATWATER_SPECIFIC: u32 = 2048;
const NUTRIENT_PROTEIN: u32 = 1003;
const NUTRIENT_FAT: u32 = 1004;
const NUTRIENT_CARBS: u32 = 1005;
const NUTRIENT_FIBER: u32 = 1079;
const NUTRIENT_SUGARS: u32 = 2000;

#[derive(Debug, Clone)]
pub struct UsdaConfig {
    pub api_key: String,
    pub base_url: String,
    /// Search results per query (1-200)
    pub page_size: u32,
    pub timeout: Duration,
    pub cache_ttl: Duration,
}

impl Default for UsdaConfig {
    fn default() -> Self {
        Self {
            api_key: DEMO_API_KEY.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            page_size: 10,
            timeout: Duration::from_secs(10),
            cache_ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    foods: Vec<SearchFood>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchFood {
    fdc_id: u64,
    description: String,
    brand_owner: Option<String>,
    #[serde(default)]
    data_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetailsResponse {
    #[serde(default)]
    food_nutrients: Vec<FoodNutrient>,
}

/// One entry of `foodNutrients` in a details response
#[derive(Debug, Clone, Deserialize)]
pub struct FoodNutrient {
    pub nutrient: Option<NutrientRef>,
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NutrientRef {
    pub id: u32,
}

struct CacheEntry<T> {
    data: T,
    expires_at: Instant,
}

/// Drop expired entries, then cache `data` under `key` for `ttl`
fn insert_fresh<K, T>(cache: &mut HashMap<K, CacheEntry<T>>, key: K, data: T, ttl: Duration)
where
    K: Eq + std::hash::Hash,
{
    let now = Instant::now();
    cache.retain(|_, entry| now < entry.expires_at);
    cache.insert(
        key,
        CacheEntry {
            data,
            expires_at: now + ttl,
        },
    );
}

/// Build a per-100g profile from a details nutrient list
///
/// Missing macros read as 0; missing fiber or sugar stay absent.
pub fn profile_from_nutrients(nutrients: &[FoodNutrient]) -> NutritionProfile {
    let find = |id: u32| {
        nutrients
            .iter()
            .find(|n| n.nutrient.as_ref().map(|r| r.id) == Some(id))
            .map(|n| n.amount.unwrap_or(0.0))
    };

    let calories = find(NUTRIENT_ENERGY_KCAL)
        .or_else(|| find(NUTRIENT_ENERGY_ATWATER_GENERAL))
        .or_else(|| find(NUTRIENT_ENERGY_ATWATER_SPECIFIC))
        .unwrap_or(0.0);

    NutritionProfile {
        calories_per_100g: calories,
        protein_per_100g: find(NUTRIENT_PROTEIN).unwrap_or(0.0),
        carbs_per_100g: find(NUTRIENT_CARBS).unwrap_or(0.0),
        fat_per_100g: find(NUTRIENT_FAT).unwrap_or(0.0),
        fiber_per_100g: find(NUTRIENT_FIBER),
        sugar_per_100g: find(NUTRIENT_SUGARS),
    }
}

fn parse_search_response(body: &str) -> Result<Vec<FoodSearchResult>, FoodDbError> {
    let response: SearchResponse =
        serde_json::from_str(body).map_err(|e| FoodDbError::Decode(e.to_string()))?;
    Ok(response
        .foods
        .into_iter()
        .map(|f| FoodSearchResult {
            id: f.fdc_id,
            name: f.description,
            brand: f.brand_owner,
            data_type: f.data_type,
        })
        .collect())
}

fn parse_details_response(body: &str) -> Result<NutritionProfile, FoodDbError> {
    let response: DetailsResponse =
        serde_json::from_str(body).map_err(|e| FoodDbError::Decode(e.to_string()))?;
    Ok(profile_from_nutrients(&response.food_nutrients))
}

/// USDA FoodData Central API client with an in-process cache
pub struct UsdaClient {
    config: UsdaConfig,
    http_client: reqwest::Client,
    search_cache: RwLock<HashMap<String, CacheEntry<Vec<FoodSearchResult>>>>,
    profile_cache: RwLock<HashMap<u64, CacheEntry<NutritionProfile>>>,
}

impl UsdaClient {
    pub fn new(config: UsdaConfig) -> Result<Self, FoodDbError> {
        if config.api_key == DEMO_API_KEY {
            tracing::warn!("Using USDA DEMO_KEY; set MENUTRI_USDA_API_KEY for higher rate limits");
        }

        let http_client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            config,
            http_client,
            search_cache: RwLock::new(HashMap::new()),
            profile_cache: RwLock::new(HashMap::new()),
        })
    }

    /// GET a URL and return the body of a 2xx response
    async fn fetch(&self, url: &str, query: &[(&str, String)]) -> Result<String, FoodDbError> {
        let response = self.http_client.get(url).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FoodDbError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.text().await?)
    }

    /// Number of cached (search, profile) entries
    pub async fn cache_stats(&self) -> (usize, usize) {
        (
            self.search_cache.read().await.len(),
            self.profile_cache.read().await.len(),
        )
    }
}

#[async_trait]
impl FoodDatabase for UsdaClient {
    async fn search_food(&self, query: &str) -> Result<Vec<FoodSearchResult>, FoodDbError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(FoodDbError::EmptyQuery);
        }

        let cache_key = query.to_lowercase();
        if let Some(entry) = self.search_cache.read().await.get(&cache_key) {
            if Instant::now() < entry.expires_at {
                return Ok(entry.data.clone());
            }
        }

        let mut params = vec![
            ("api_key", self.config.api_key.clone()),
            ("query", query.to_string()),
            ("pageSize", self.config.page_size.to_string()),
        ];
        params.extend(SEARCH_DATA_TYPES.iter().map(|t| ("dataType", t.to_string())));

        let url = format!("{}/foods/search", self.config.base_url);
        let body = self.fetch(&url, &params).await.map_err(|e| {
            tracing::warn!(query, error = %e, "USDA food search failed");
            e
        })?;
        let results = parse_search_response(&body)?;
        tracing::debug!(query, hits = results.len(), "USDA food search");

        insert_fresh(
            &mut *self.search_cache.write().await,
            cache_key,
            results.clone(),
            self.config.cache_ttl,
        );

        Ok(results)
    }

    async fn get_profile(&self, id: u64) -> Result<NutritionProfile, FoodDbError> {
        if let Some(entry) = self.profile_cache.read().await.get(&id) {
            if Instant::now() < entry.expires_at {
                return Ok(entry.data);
            }
        }

        let url = format!("{}/food/{}", self.config.base_url, id);
        let body = match self.fetch(&url, &[("api_key", self.config.api_key.clone())]).await {
            Ok(body) => body,
            Err(FoodDbError::Status { status: 404, .. }) => return Err(FoodDbError::NotFound(id)),
            Err(e) => {
                tracing::warn!(fdc_id = id, error = %e, "USDA food lookup failed");
                return Err(e);
            }
        };
        let profile = parse_details_response(&body)?;

        insert_fresh(&mut *self.profile_cache.write().await, id, profile, self.config.cache_ttl);

        Ok(profile)
    }
}
