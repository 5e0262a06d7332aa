//! Read queries for the curated `food_index` table.

use serde_json::Value;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `food_index` table. `nutrients` is the JSON array of
/// `{nutrientNumber, nutrientName, amount}` objects as loaded.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FoodIndexRow {
    pub fdc_id: i64,
    pub label: String,
    pub data_type: Option<String>,
    pub category: Option<String>,
    pub nutrients: Value,
}

/// Returns index rows whose label contains `query` (case-insensitive), ordered by label.
///
/// `%` and `_` in `query` match literally.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn search_food_index(
    pool: &PgPool,
    query: &str,
    limit: i64,
) -> Result<Vec<FoodIndexRow>, DbError> {
    let rows = sqlx::query_as::<_, FoodIndexRow>(
        "SELECT fdc_id, label, data_type, category, nutrients \
         FROM food_index \
         WHERE label ILIKE $1 ESCAPE '\\' \
         ORDER BY label, fdc_id \
         LIMIT $2",
    )
    .bind(like_pattern(query))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Wraps `query` in `%...%` after escaping LIKE metacharacters.
fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for ch in query.trim().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}
