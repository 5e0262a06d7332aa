mod app_config;
pub mod cache;
mod config;
pub mod foods;
pub mod memory;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use cache::{CacheEntry, CachePolicy, FoodCacheStore, StoreError, DEFAULT_CACHE_TTL_DAYS};
pub use config::{load_app_config, load_app_config_from_env};
pub use foods::{
    round2, NormalizedFood, NormalizedPortion, NutrientAmount, SearchPage, DEFAULT_PORTION_UNIT,
    DEFAULT_VISUAL_PARENT, UNKNOWN_CATEGORY,
};
pub use memory::MemoryFoodCache;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
