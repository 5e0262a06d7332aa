//! Provider wire types and raw FoodData Central record shapes.
//!
//! ## Provider proxy
//! Every call is a `POST` of `{"action": "search" | "details", ...params}` and
//! every answer is the envelope `{success, status, data, error}`. A
//! `success: false` envelope is a provider-level failure, distinct from a
//! transport error.
//!
//! ## Observed record shapes
//!
//! ### Detail records (`/food/{fdcId}`)
//! Nutrients arrive in two shapes depending on data type and on whether the
//! `nutrients` filter was applied:
//! - flat: `{"nutrientId": 1008, "nutrientName": "Energy", "unitName": "KCAL", "value": 52}`
//! - nested: `{"nutrient": {"id": 1008, "number": "208", "name": "Energy", "unitName": "kcal"}, "amount": 52}`
//!
//! Portions carry their label in `portionDescription` (Foundation, Survey),
//! `modifier` (SR Legacy), or only in `measureUnit.name`. SR Legacy sends
//! `measureUnit.name = "undetermined"` alongside a real `modifier`.
//!
//! ### Categories
//! `foodCategory` is an object `{description, code}` on detail records and a
//! plain string on search hits. Survey foods use `wweiaFoodCategory`; branded
//! foods use the `brandedFoodCategory` string.
//!
//! ### Search-index records
//! The curated index stores `{fdcId, label, dataType, category, nutrients}`
//! where each nutrient is keyed by its legacy `nutrientNumber` string
//! (`"208"` for energy) and carries `amount`.
//!
//! Fields are parsed leniently: numbers, numeric strings, and `null` are all
//! accepted for numeric fields, and a nested value of the wrong shape becomes
//! `None` (or is dropped from its list), so one odd field never discards a
//! whole record.

use serde::{Deserialize, Serialize};

use crate::error::FoodDataError;

// ---------------------------------------------------------------------------
// Provider request / response
// ---------------------------------------------------------------------------

/// Request body sent to the provider proxy.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ProviderRequest {
    Search(SearchParams),
    Details(DetailsParams),
}

impl ProviderRequest {
    /// The `action` discriminator sent on the wire.
    #[must_use]
    pub fn action(&self) -> &'static str {
        match self {
            ProviderRequest::Search(_) => "search",
            ProviderRequest::Details(_) => "details",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub query: String,
    /// Data-type filter, e.g. `["Foundation", "SR Legacy"]`. Empty means all.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub data_type: Vec<String>,
    pub page_size: u32,
    pub page_number: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailsParams {
    pub fdc_id: i64,
    /// Legacy nutrient numbers to restrict the payload to. `None` requests
    /// the full record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nutrients: Option<Vec<u32>>,
}

/// Response envelope returned by the provider proxy for every action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ProviderEnvelope {
    /// A successful envelope carrying `data`.
    #[must_use]
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            success: true,
            status: 200,
            data: Some(data),
            error: None,
        }
    }

    /// A failed envelope with the given status and message.
    #[must_use]
    pub fn failure(status: u16, message: impl Into<String>) -> Self {
        Self {
            success: false,
            status,
            data: None,
            error: Some(message.into()),
        }
    }

    /// Unwraps the payload of a successful envelope.
    ///
    /// # Errors
    ///
    /// - [`FoodDataError::Provider`] if `success` is `false`.
    /// - [`FoodDataError::EmptyPayload`] if `data` is missing, `null`, or an
    ///   empty object/array.
    pub fn into_payload(self, action: &str) -> Result<serde_json::Value, FoodDataError> {
        if !self.success {
            return Err(FoodDataError::Provider {
                status: self.status,
                message: self
                    .error
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "unknown provider error".to_string()),
            });
        }

        match self.data {
            None | Some(serde_json::Value::Null) => Err(FoodDataError::EmptyPayload {
                action: action.to_string(),
            }),
            Some(serde_json::Value::Object(ref map)) if map.is_empty() => {
                Err(FoodDataError::EmptyPayload {
                    action: action.to_string(),
                })
            }
            Some(serde_json::Value::Array(ref items)) if items.is_empty() => {
                Err(FoodDataError::EmptyPayload {
                    action: action.to_string(),
                })
            }
            Some(data) => Ok(data),
        }
    }
}

// ---------------------------------------------------------------------------
// Detail-variant records
// ---------------------------------------------------------------------------

/// A food record as returned by the `details` action or embedded in a search page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawFoodRecord {
    #[serde(deserialize_with = "lenient::i64_opt")]
    pub fdc_id: Option<i64>,
    #[serde(deserialize_with = "lenient::string_opt")]
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient::string_opt")]
    pub data_type: Option<String>,
    #[serde(deserialize_with = "lenient::string_opt")]
    pub publication_date: Option<String>,
    #[serde(deserialize_with = "lenient::shape_opt")]
    pub food_category: Option<RawCategory>,
    #[serde(deserialize_with = "lenient::shape_opt")]
    pub wweia_food_category: Option<RawWweiaCategory>,
    #[serde(deserialize_with = "lenient::string_opt")]
    pub branded_food_category: Option<String>,
    #[serde(deserialize_with = "lenient::vec_or_empty")]
    pub food_nutrients: Vec<RawFoodNutrient>,
    #[serde(deserialize_with = "lenient::vec_or_empty")]
    pub food_portions: Vec<RawFoodPortion>,
}

/// `foodCategory`: an object on detail records, a bare string on search hits.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawCategory {
    Name(String),
    Detailed(RawCategoryDetail),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawCategoryDetail {
    #[serde(deserialize_with = "lenient::string_opt")]
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient::string_opt")]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawWweiaCategory {
    #[serde(deserialize_with = "lenient::string_opt")]
    pub wweia_food_category_description: Option<String>,
    #[serde(deserialize_with = "lenient::string_opt")]
    pub wweia_food_category_code: Option<String>,
}

/// One nutrient entry in either the flat or the nested shape. Both sets of
/// fields are optional; an entry may carry either, or occasionally both.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawFoodNutrient {
    #[serde(deserialize_with = "lenient::u32_opt")]
    pub nutrient_id: Option<u32>,
    #[serde(deserialize_with = "lenient::string_opt")]
    pub nutrient_name: Option<String>,
    #[serde(deserialize_with = "lenient::string_opt")]
    pub nutrient_number: Option<String>,
    #[serde(deserialize_with = "lenient::string_opt")]
    pub unit_name: Option<String>,
    #[serde(deserialize_with = "lenient::f64_opt")]
    pub value: Option<f64>,
    #[serde(deserialize_with = "lenient::shape_opt")]
    pub nutrient: Option<RawNutrientRef>,
    #[serde(deserialize_with = "lenient::f64_opt")]
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawNutrientRef {
    #[serde(deserialize_with = "lenient::u32_opt")]
    pub id: Option<u32>,
    #[serde(deserialize_with = "lenient::string_opt")]
    pub number: Option<String>,
    #[serde(deserialize_with = "lenient::string_opt")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient::string_opt")]
    pub unit_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawFoodPortion {
    #[serde(deserialize_with = "lenient::i64_opt")]
    pub id: Option<i64>,
    #[serde(deserialize_with = "lenient::f64_opt")]
    pub amount: Option<f64>,
    #[serde(deserialize_with = "lenient::f64_opt")]
    pub gram_weight: Option<f64>,
    #[serde(deserialize_with = "lenient::string_opt")]
    pub portion_description: Option<String>,
    #[serde(deserialize_with = "lenient::string_opt")]
    pub modifier: Option<String>,
    #[serde(deserialize_with = "lenient::shape_opt")]
    pub measure_unit: Option<RawMeasureUnit>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawMeasureUnit {
    #[serde(deserialize_with = "lenient::i64_opt")]
    pub id: Option<i64>,
    #[serde(deserialize_with = "lenient::string_opt")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient::string_opt")]
    pub abbreviation: Option<String>,
}

/// One page of results from the `search` action.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawSearchResponse {
    #[serde(deserialize_with = "lenient::u64_opt")]
    pub total_hits: Option<u64>,
    #[serde(deserialize_with = "lenient::u32_opt")]
    pub current_page: Option<u32>,
    #[serde(deserialize_with = "lenient::u32_opt")]
    pub total_pages: Option<u32>,
    #[serde(deserialize_with = "lenient::vec_or_empty")]
    pub foods: Vec<RawFoodRecord>,
}

// ---------------------------------------------------------------------------
// Search-index records
// ---------------------------------------------------------------------------

/// A compact record from the curated search index.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IndexFoodRecord {
    #[serde(deserialize_with = "lenient::i64_opt")]
    pub fdc_id: Option<i64>,
    #[serde(deserialize_with = "lenient::string_opt")]
    pub label: Option<String>,
    #[serde(deserialize_with = "lenient::string_opt")]
    pub data_type: Option<String>,
    #[serde(deserialize_with = "lenient::string_opt")]
    pub category: Option<String>,
    #[serde(deserialize_with = "lenient::vec_or_empty")]
    pub nutrients: Vec<IndexNutrient>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IndexNutrient {
    /// Legacy nutrient number, e.g. `"208"`; some rows carry a modern id instead.
    #[serde(deserialize_with = "lenient::string_opt")]
    pub nutrient_number: Option<String>,
    #[serde(deserialize_with = "lenient::string_opt")]
    pub nutrient_name: Option<String>,
    #[serde(deserialize_with = "lenient::string_opt")]
    pub unit_name: Option<String>,
    #[serde(deserialize_with = "lenient::f64_opt")]
    pub amount: Option<f64>,
}

mod lenient {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub(super) fn f64_opt<'de, D>(d: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|v| v.is_finite()))
    }

    pub(super) fn i64_opt<'de, D>(d: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        })
    }

    pub(super) fn u64_opt<'de, D>(d: D) -> Result<Option<u64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        })
    }

    pub(super) fn u32_opt<'de, D>(d: D) -> Result<Option<u32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(u64_opt(d)?.and_then(|v| u32::try_from(v).ok()))
    }

    pub(super) fn string_opt<'de, D>(d: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    /// Any value that does not fit `T` becomes `None`.
    pub(super) fn shape_opt<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        Ok(match Value::deserialize(d)? {
            Value::Null => None,
            other => serde_json::from_value(other).ok(),
        })
    }

    /// Non-arrays become empty; array elements that do not fit `T` are dropped.
    pub(super) fn vec_or_empty<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        Ok(match Value::deserialize(d)? {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
            _ => Vec::new(),
        })
    }
}
