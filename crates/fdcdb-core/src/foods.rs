use serde::{Deserialize, Serialize};

/// Grouping key used when a food has no usable description.
pub const DEFAULT_VISUAL_PARENT: &str = "food";

/// Category name used when the upstream record carries no category.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Unit label used when a portion carries no descriptive text at all.
pub const DEFAULT_PORTION_UNIT: &str = "serving";

/// Every `f64` at or above 2^52 in magnitude is already a whole number.
const WHOLE_NUMBER_FLOOR: f64 = 4_503_599_627_370_496.0;

/// Rounds to two decimal places (`(x * 100).round() / 100`).
///
/// Non-finite input rounds to `0.0` so callers never propagate `NaN` or
/// infinities into stored payloads. Magnitudes of 2^52 and above have no
/// fractional part and are returned unchanged, which also keeps `x * 100`
/// from overflowing.
#[must_use]
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    if value.abs() >= WHOLE_NUMBER_FLOOR {
        return value;
    }
    (value * 100.0).round() / 100.0
}

/// A food record normalized from one of the upstream FoodData Central shapes.
///
/// All macro values are per 100 g of the food, rounded to two decimals, and
/// never negative. A nutrient missing upstream is `0.0`, not absent, so
/// consumers can do arithmetic without null checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedFood {
    /// FoodData Central identifier.
    pub fdc_id: i64,
    pub description: String,
    /// Upstream data type tag, e.g. `"Foundation"`, `"SR Legacy"`, `"Branded"`.
    pub data_type: String,
    /// Publication date exactly as the upstream sends it, if any.
    pub publication_date: Option<String>,
    pub energy_kcal: f64,
    pub protein_g: f64,
    pub fat_g: f64,
    pub carbs_g: f64,
    pub sugar_g: f64,
    pub fiber_g: f64,
    pub sodium_mg: f64,
    /// Coarse grouping key derived from the description, e.g. `"apples"` for
    /// `"Apples, raw, fuji"`. Used to share one generated image across
    /// preparation variants of the same base ingredient.
    pub visual_parent: String,
    pub category_name: String,
    /// Upstream category code; `None` when the upstream sends only a name or
    /// nothing at all.
    pub category_code: Option<String>,
    pub portions: Vec<NormalizedPortion>,
    /// Every nutrient the upstream sent, flattened, for detail display.
    pub nutrients: Vec<NutrientAmount>,
}

impl NormalizedFood {
    /// Energy in kcal for the given portion, scaled from the per-100 g value.
    #[must_use]
    pub fn energy_for_portion(&self, portion: &NormalizedPortion) -> f64 {
        round2(self.energy_kcal * portion.gram_weight / 100.0)
    }
}

/// A serving-size entry, e.g. `1.0 cup = 125 g`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPortion {
    pub id: Option<i64>,
    pub amount: f64,
    pub gram_weight: f64,
    /// Always non-empty; falls back to [`DEFAULT_PORTION_UNIT`].
    pub unit: String,
}

/// One nutrient value in a flat, display-ready shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutrientAmount {
    pub nutrient_id: Option<u32>,
    /// Legacy nutrient number (e.g. `"208"` for energy), when the upstream sent one.
    pub number: Option<String>,
    pub name: String,
    pub unit_name: String,
    pub amount: f64,
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    pub total_hits: u64,
    pub current_page: u32,
    pub total_pages: u32,
    pub foods: Vec<NormalizedFood>,
}

impl SearchPage {
    /// Returns `true` when there are pages after this one.
    #[must_use]
    pub fn has_next_page(&self) -> bool {
        self.current_page < self.total_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn food_with_energy(energy_kcal: f64) -> NormalizedFood {
        NormalizedFood {
            fdc_id: 1,
            description: "Apples, raw, fuji".to_owned(),
            data_type: "Foundation".to_owned(),
            publication_date: None,
            energy_kcal,
            protein_g: 0.0,
            fat_g: 0.0,
            carbs_g: 0.0,
            sugar_g: 0.0,
            fiber_g: 0.0,
            sodium_mg: 0.0,
            visual_parent: "apples".to_owned(),
            category_name: UNKNOWN_CATEGORY.to_owned(),
            category_code: None,
            portions: vec![],
            nutrients: vec![NutrientAmount {
                nutrient_id: Some(1008),
                number: Some("208".to_owned()),
                name: "Energy".to_owned(),
                unit_name: "KCAL".to_owned(),
                amount: energy_kcal,
            }],
        }
    }

    #[test]
    fn round2_rounds_to_two_decimals() {
        assert!((round2(1.234_567) - 1.23).abs() < f64::EPSILON);
        assert!((round2(0.005) - 0.01).abs() < f64::EPSILON);
    }

    #[test]
    fn round2_is_idempotent() {
        for x in [0.0, 1.005, 52.499_999, 123.456, 0.1 + 0.2, 9_999.995] {
            let once = round2(x);
            assert_eq!(round2(once).to_bits(), once.to_bits(), "x = {x}");
        }
    }

    #[test]
    fn round2_keeps_huge_values_finite() {
        for x in [1.0e307, -1.0e307, f64::MAX, 1.0e16] {
            let once = round2(x);
            assert!(once.is_finite(), "x = {x}");
            assert_eq!(once.to_bits(), x.to_bits(), "x = {x}");
            assert_eq!(round2(once).to_bits(), once.to_bits(), "x = {x}");
        }
    }

    #[test]
    fn round2_maps_non_finite_to_zero() {
        assert_eq!(round2(f64::NAN), 0.0);
        assert_eq!(round2(f64::INFINITY), 0.0);
    }

    #[test]
    fn energy_for_portion_scales_from_per_100g() {
        let food = food_with_energy(52.0);
        let portion = NormalizedPortion {
            id: Some(1),
            amount: 1.0,
            gram_weight: 182.0,
            unit: "medium".to_owned(),
        };
        assert!((food.energy_for_portion(&portion) - 94.64).abs() < 1e-9);
    }

    #[test]
    fn search_page_has_next_page() {
        let page = SearchPage {
            total_hits: 30,
            current_page: 1,
            total_pages: 2,
            foods: vec![],
        };
        assert!(page.has_next_page());
        let last = SearchPage {
            current_page: 2,
            ..page
        };
        assert!(!last.has_next_page());
    }
}
