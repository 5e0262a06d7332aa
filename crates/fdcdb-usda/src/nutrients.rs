//! Priority-ordered nutrient resolution.
//!
//! Every upstream shape is first lowered into [`NutrientEntry`] values, then
//! a macro value is resolved by walking a list of candidate nutrient ids in
//! priority order. The first candidate with any matching entry wins, even when
//! that entry's quantity is zero.

use fdcdb_core::{round2, NutrientAmount};

use crate::types::{IndexNutrient, RawFoodNutrient};

/// FoodData Central nutrient ids.
pub mod ids {
    pub const ENERGY_KCAL: u32 = 1008;
    pub const ENERGY_ATWATER_SPECIFIC: u32 = 2048;
    pub const ENERGY_ATWATER_GENERAL: u32 = 2047;
    pub const PROTEIN: u32 = 1003;
    pub const FAT: u32 = 1004;
    pub const CARBOHYDRATE: u32 = 1005;
    pub const SUGARS: u32 = 2000;
    pub const FIBER: u32 = 1079;
    pub const SODIUM: u32 = 1093;
}

/// Energy candidates: plain kcal, then Atwater specific, then Atwater general.
pub const ENERGY_PRIORITY: [u32; 3] = [
    ids::ENERGY_KCAL,
    ids::ENERGY_ATWATER_SPECIFIC,
    ids::ENERGY_ATWATER_GENERAL,
];

/// Legacy nutrient numbers paired with their modern ids.
pub const NUMBER_TO_ID: [(&str, u32); 9] = [
    ("208", ids::ENERGY_KCAL),
    ("958", ids::ENERGY_ATWATER_SPECIFIC),
    ("957", ids::ENERGY_ATWATER_GENERAL),
    ("203", ids::PROTEIN),
    ("204", ids::FAT),
    ("205", ids::CARBOHYDRATE),
    ("269", ids::SUGARS),
    ("291", ids::FIBER),
    ("307", ids::SODIUM),
];

/// Nutrient numbers requested by the reduced-payload detail fetch.
pub const OPTIMIZED_NUTRIENT_NUMBERS: [u32; 9] = [208, 958, 957, 203, 204, 205, 269, 291, 307];

/// Maps a legacy nutrient number such as `"208"` to its modern id.
#[must_use]
pub fn id_for_number(number: &str) -> Option<u32> {
    let number = number.trim();
    NUMBER_TO_ID
        .iter()
        .find(|(n, _)| *n == number)
        .map(|(_, id)| *id)
}

/// A nutrient entry lowered from any upstream shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NutrientEntry {
    /// Flat id (`nutrientId`).
    pub id: Option<u32>,
    /// Nested id (`nutrient.id`).
    pub nested_id: Option<u32>,
    pub number: Option<String>,
    pub name: String,
    pub unit_name: String,
    /// Detail-format quantity.
    pub amount: Option<f64>,
    /// Search-format quantity.
    pub value: Option<f64>,
}

impl NutrientEntry {
    /// Lowers a detail or search-hit nutrient, keeping both the flat and the
    /// nested fields.
    #[must_use]
    pub fn from_detail(raw: &RawFoodNutrient) -> Self {
        let nested = raw.nutrient.as_ref();
        Self {
            id: raw.nutrient_id,
            nested_id: nested.and_then(|n| n.id),
            number: nested
                .and_then(|n| n.number.clone())
                .or_else(|| raw.nutrient_number.clone()),
            name: nested
                .and_then(|n| n.name.clone())
                .or_else(|| raw.nutrient_name.clone())
                .unwrap_or_default(),
            unit_name: nested
                .and_then(|n| n.unit_name.clone())
                .or_else(|| raw.unit_name.clone())
                .unwrap_or_default(),
            amount: raw.amount,
            value: raw.value,
        }
    }

    /// Lowers an index nutrient, translating its number through [`NUMBER_TO_ID`].
    #[must_use]
    pub fn from_index_translated(raw: &IndexNutrient) -> Self {
        Self::from_index(raw, raw.nutrient_number.as_deref().and_then(id_for_number))
    }

    /// Lowers an index nutrient, reading its number as an id directly.
    #[must_use]
    pub fn from_index_direct(raw: &IndexNutrient) -> Self {
        Self::from_index(
            raw,
            raw.nutrient_number
                .as_deref()
                .and_then(|n| n.trim().parse().ok()),
        )
    }

    fn from_index(raw: &IndexNutrient, id: Option<u32>) -> Self {
        Self {
            id,
            nested_id: None,
            number: raw.nutrient_number.clone(),
            name: raw.nutrient_name.clone().unwrap_or_default(),
            unit_name: raw.unit_name.clone().unwrap_or_default(),
            amount: raw.amount,
            value: None,
        }
    }

    fn matches(&self, id: u32) -> bool {
        self.nested_id == Some(id) || self.id == Some(id)
    }

    fn quantity(&self) -> f64 {
        self.amount.or(self.value).unwrap_or(0.0)
    }

    /// Flattens into the display shape stored on a normalized food.
    #[must_use]
    pub fn to_amount(&self) -> NutrientAmount {
        NutrientAmount {
            nutrient_id: self.nested_id.or(self.id),
            number: self.number.clone(),
            name: self.name.clone(),
            unit_name: self.unit_name.clone(),
            amount: clean(self.quantity()),
        }
    }
}

/// Returns the cleaned quantity of the first candidate with a matching entry,
/// or `None` if no candidate matches anything.
#[must_use]
pub fn find_value(entries: &[NutrientEntry], candidates: &[u32]) -> Option<f64> {
    candidates.iter().find_map(|&id| {
        entries
            .iter()
            .find(|entry| entry.matches(id))
            .map(|entry| clean(entry.quantity()))
    })
}

/// Like [`find_value`] but defaults to `0.0` when nothing matches.
#[must_use]
pub fn resolve_value(entries: &[NutrientEntry], candidates: &[u32]) -> f64 {
    find_value(entries, candidates).unwrap_or(0.0)
}

/// Negative and non-finite quantities become `0.0`; the rest round to two decimals.
fn clean(quantity: f64) -> f64 {
    if quantity.is_finite() && quantity > 0.0 {
        round2(quantity)
    } else {
        0.0
    }
}
