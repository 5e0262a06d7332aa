//! Cache entries, freshness policy, and the storage seam for cached food detail.
//!
//! The store itself is an external collaborator (Postgres in production, an
//! in-memory map in tests). This module only decides *whether* a stored entry
//! may be served; entries are never deleted, expiry is a read-time check.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::foods::NormalizedFood;

/// Default validity window for cached detail records.
pub const DEFAULT_CACHE_TTL_DAYS: u32 = 30;

/// One cached detail record, keyed by `fdc_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub fdc_id: i64,
    pub data_type: String,
    /// The provider payload exactly as it was received.
    pub raw: serde_json::Value,
    pub captured_at: DateTime<Utc>,
    pub visual_parent: String,
    /// Serialized [`NormalizedFood`]. `None` for rows written before
    /// normalization was stored.
    pub normalized: Option<serde_json::Value>,
}

impl CacheEntry {
    /// Builds the entry written after a successful fetch.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Encode`] if `food` cannot be serialized.
    pub fn from_fetch(
        raw: serde_json::Value,
        food: &NormalizedFood,
        captured_at: DateTime<Utc>,
    ) -> Result<Self, StoreError> {
        let normalized = serde_json::to_value(food).map_err(|source| StoreError::Encode {
            fdc_id: food.fdc_id,
            source,
        })?;

        Ok(Self {
            fdc_id: food.fdc_id,
            data_type: food.data_type.clone(),
            raw,
            captured_at,
            visual_parent: food.visual_parent.clone(),
            normalized: Some(normalized),
        })
    }

    /// Decodes the stored normalized payload.
    ///
    /// Returns `None` when the payload is absent or no longer matches the
    /// current [`NormalizedFood`] shape; either way the caller should treat
    /// the entry as a miss.
    #[must_use]
    pub fn normalized_food(&self) -> Option<NormalizedFood> {
        let value = self.normalized.as_ref()?;
        match serde_json::from_value::<NormalizedFood>(value.clone()) {
            Ok(food) => Some(food),
            Err(e) => {
                tracing::warn!(
                    fdc_id = self.fdc_id,
                    error = %e,
                    "cached normalized payload does not decode, treating as miss"
                );
                None
            }
        }
    }
}

/// Time-based freshness rule for [`CacheEntry`] values.
///
/// An entry is fresh while `now - captured_at <= ttl`; the boundary itself is
/// still fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    ttl: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::from_days(DEFAULT_CACHE_TTL_DAYS)
    }
}

impl CachePolicy {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    #[must_use]
    pub fn from_days(days: u32) -> Self {
        Self::new(Duration::days(i64::from(days)))
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns `true` if an entry captured at `captured_at` may still be served.
    #[must_use]
    pub fn is_fresh(&self, captured_at: DateTime<Utc>) -> bool {
        self.is_fresh_at(captured_at, Utc::now())
    }

    /// Same as [`CachePolicy::is_fresh`] with an explicit clock.
    #[must_use]
    pub fn is_fresh_at(&self, captured_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(captured_at) <= self.ttl
    }
}

/// Errors raised by a [`FoodCacheStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store rejected or failed the operation.
    #[error("cache backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A value could not be serialized for storage.
    #[error("cache payload for fdc_id {fdc_id} could not be encoded: {source}")]
    Encode {
        fdc_id: i64,
        #[source]
        source: serde_json::Error,
    },
}

/// Point-lookup / upsert storage for cached food detail, keyed by `fdc_id`.
///
/// Implementations must give upsert "overwrite the existing row" semantics so
/// there is at most one entry per identifier.
#[async_trait]
pub trait FoodCacheStore: Send + Sync {
    /// Returns the stored entry for `fdc_id`, or `None` if there is none.
    async fn get(&self, fdc_id: i64) -> Result<Option<CacheEntry>, StoreError>;

    /// Inserts `entry`, replacing any existing entry with the same `fdc_id`.
    async fn upsert(&self, entry: &CacheEntry) -> Result<(), StoreError>;
}
