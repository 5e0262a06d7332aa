//! FoodData Central provider client, normalization, and cache-first detail retrieval.

pub mod client;
pub mod error;
pub mod normalize;
pub mod nutrients;
pub mod portions;
pub(crate) mod retry;
pub mod service;
pub mod types;

pub use client::{FoodDataProvider, ProxyClient};
pub use error::FoodDataError;
pub use normalize::{normalize_food, normalize_index_record, normalize_search_page, visual_parent};
pub use nutrients::{resolve_value, NutrientEntry, ENERGY_PRIORITY};
pub use portions::normalize_portion;
pub use retry::{RetryPolicy, RetryProgress};
pub use service::{CacheWriteFailure, FoodDetailService};
pub use types::{IndexFoodRecord, ProviderEnvelope, ProviderRequest, RawFoodRecord};
