//! Database operations for the `food_cache` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;

use fdcdb_core::{CacheEntry, FoodCacheStore, StoreError};

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `food_cache` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FoodCacheRow {
    pub fdc_id: i64,
    pub data_type: String,
    pub raw: Value,
    pub captured_at: DateTime<Utc>,
    pub visual_parent: String,
    pub normalized: Option<Value>,
    pub updated_at: DateTime<Utc>,
}

impl From<FoodCacheRow> for CacheEntry {
    fn from(row: FoodCacheRow) -> Self {
        Self {
            fdc_id: row.fdc_id,
            data_type: row.data_type,
            raw: row.raw,
            captured_at: row.captured_at,
            visual_parent: row.visual_parent,
            normalized: row.normalized,
        }
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns the cached row for `fdc_id`, or `None` if the food was never cached.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_food_cache(pool: &PgPool, fdc_id: i64) -> Result<Option<FoodCacheRow>, DbError> {
    let row = sqlx::query_as::<_, FoodCacheRow>(
        "SELECT fdc_id, data_type, raw, captured_at, visual_parent, normalized, updated_at \
         FROM food_cache \
         WHERE fdc_id = $1",
    )
    .bind(fdc_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Inserts or replaces the cached row for `entry.fdc_id`.
///
/// Every column is overwritten on conflict, so the row always reflects the
/// most recent successful fetch.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn upsert_food_cache(pool: &PgPool, entry: &CacheEntry) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO food_cache \
             (fdc_id, data_type, raw, captured_at, visual_parent, normalized) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (fdc_id) DO UPDATE SET \
             data_type = EXCLUDED.data_type, \
             raw = EXCLUDED.raw, \
             captured_at = EXCLUDED.captured_at, \
             visual_parent = EXCLUDED.visual_parent, \
             normalized = EXCLUDED.normalized, \
             updated_at = NOW()",
    )
    .bind(entry.fdc_id)
    .bind(&entry.data_type)
    .bind(&entry.raw)
    .bind(entry.captured_at)
    .bind(&entry.visual_parent)
    .bind(&entry.normalized)
    .execute(pool)
    .await?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Store implementation
// ---------------------------------------------------------------------------

/// [`FoodCacheStore`] backed by the `food_cache` table.
#[derive(Debug, Clone)]
pub struct PgFoodCache {
    pool: PgPool,
}

impl PgFoodCache {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FoodCacheStore for PgFoodCache {
    async fn get(&self, fdc_id: i64) -> Result<Option<CacheEntry>, StoreError> {
        get_food_cache(&self.pool, fdc_id)
            .await
            .map(|row| row.map(CacheEntry::from))
            .map_err(|e| StoreError::Backend(Box::new(e)))
    }

    async fn upsert(&self, entry: &CacheEntry) -> Result<(), StoreError> {
        upsert_food_cache(&self.pool, entry)
            .await
            .map_err(|e| StoreError::Backend(Box::new(e)))
    }
}
