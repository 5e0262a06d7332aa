//! Normalization of raw FoodData Central records into [`NormalizedFood`].
//!
//! Two entry points cover the two upstream shapes: [`normalize_food`] for
//! detail records and search hits, [`normalize_index_record`] for the compact
//! search-index rows. Both resolve the same macro set through
//! [`crate::nutrients`] so a food looks identical whichever path produced it.

use fdcdb_core::{NormalizedFood, SearchPage, DEFAULT_VISUAL_PARENT, UNKNOWN_CATEGORY};

use crate::nutrients::{find_value, ids, resolve_value, NutrientEntry, ENERGY_PRIORITY};
use crate::portions::normalize_portion;
use crate::types::{IndexFoodRecord, RawCategory, RawFoodRecord, RawSearchResponse};

/// Data type reported when the upstream omits it.
pub const UNKNOWN_DATA_TYPE: &str = "Unknown";

struct Macros {
    energy_kcal: f64,
    protein_g: f64,
    fat_g: f64,
    carbs_g: f64,
    sugar_g: f64,
    fiber_g: f64,
    sodium_mg: f64,
}

impl Macros {
    fn resolve(resolve: impl Fn(&[u32]) -> f64) -> Self {
        Self {
            energy_kcal: resolve(&ENERGY_PRIORITY),
            protein_g: resolve(&[ids::PROTEIN]),
            fat_g: resolve(&[ids::FAT]),
            carbs_g: resolve(&[ids::CARBOHYDRATE]),
            sugar_g: resolve(&[ids::SUGARS]),
            fiber_g: resolve(&[ids::FIBER]),
            sodium_mg: resolve(&[ids::SODIUM]),
        }
    }
}

/// Derives the grouping key: the text before the first comma, trimmed and
/// lowercased. `"Apples, raw, fuji"` becomes `"apples"`.
#[must_use]
pub fn visual_parent(description: &str) -> String {
    let head = description
        .split(',')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    if head.is_empty() {
        DEFAULT_VISUAL_PARENT.to_owned()
    } else {
        head
    }
}

/// Picks the category name and code from whichever category field is present.
///
/// Order: `foodCategory`, `wweiaFoodCategory`, `brandedFoodCategory`. The code
/// comes from the same source as the name and is `None` for string-only sources.
#[must_use]
pub fn resolve_category(raw: &RawFoodRecord) -> (String, Option<String>) {
    let from_food_category = raw.food_category.as_ref().and_then(|c| match c {
        RawCategory::Name(name) => non_blank(Some(name)).map(|n| (n, None)),
        RawCategory::Detailed(detail) => non_blank(detail.description.as_ref())
            .map(|n| (n, detail.code.clone().filter(|c| !c.is_empty()))),
    });

    let from_wweia = || {
        raw.wweia_food_category.as_ref().and_then(|c| {
            non_blank(c.wweia_food_category_description.as_ref()).map(|n| {
                (
                    n,
                    c.wweia_food_category_code.clone().filter(|c| !c.is_empty()),
                )
            })
        })
    };

    let from_branded = || non_blank(raw.branded_food_category.as_ref()).map(|n| (n, None));

    from_food_category
        .or_else(from_wweia)
        .or_else(from_branded)
        .unwrap_or_else(|| (UNKNOWN_CATEGORY.to_owned(), None))
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// Converts a detail record (or a search hit) into a [`NormalizedFood`].
///
/// Never fails: missing or malformed fields take their documented defaults.
#[must_use]
pub fn normalize_food(raw: &RawFoodRecord) -> NormalizedFood {
    let entries: Vec<NutrientEntry> = raw
        .food_nutrients
        .iter()
        .map(NutrientEntry::from_detail)
        .collect();
    let macros = Macros::resolve(|candidates| resolve_value(&entries, candidates));
    let description = raw
        .description
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .to_owned();
    let (category_name, category_code) = resolve_category(raw);

    NormalizedFood {
        fdc_id: raw.fdc_id.unwrap_or_default(),
        visual_parent: visual_parent(&description),
        description,
        data_type: non_blank(raw.data_type.as_ref())
            .unwrap_or_else(|| UNKNOWN_DATA_TYPE.to_owned()),
        publication_date: non_blank(raw.publication_date.as_ref()),
        energy_kcal: macros.energy_kcal,
        protein_g: macros.protein_g,
        fat_g: macros.fat_g,
        carbs_g: macros.carbs_g,
        sugar_g: macros.sugar_g,
        fiber_g: macros.fiber_g,
        sodium_mg: macros.sodium_mg,
        category_name,
        category_code,
        portions: raw.food_portions.iter().map(normalize_portion).collect(),
        nutrients: entries.iter().map(NutrientEntry::to_amount).collect(),
    }
}

/// Converts a search-index row into a [`NormalizedFood`].
///
/// Nutrient numbers are translated to ids first; a candidate that finds
/// nothing that way is retried with the number read as an id directly.
#[must_use]
pub fn normalize_index_record(record: &IndexFoodRecord) -> NormalizedFood {
    let translated: Vec<NutrientEntry> = record
        .nutrients
        .iter()
        .map(NutrientEntry::from_index_translated)
        .collect();
    let direct: Vec<NutrientEntry> = record
        .nutrients
        .iter()
        .map(NutrientEntry::from_index_direct)
        .collect();
    let macros = Macros::resolve(|candidates| {
        find_value(&translated, candidates)
            .or_else(|| find_value(&direct, candidates))
            .unwrap_or(0.0)
    });
    let description = record
        .label
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .to_owned();

    NormalizedFood {
        fdc_id: record.fdc_id.unwrap_or_default(),
        visual_parent: visual_parent(&description),
        description,
        data_type: non_blank(record.data_type.as_ref())
            .unwrap_or_else(|| UNKNOWN_DATA_TYPE.to_owned()),
        publication_date: None,
        energy_kcal: macros.energy_kcal,
        protein_g: macros.protein_g,
        fat_g: macros.fat_g,
        carbs_g: macros.carbs_g,
        sugar_g: macros.sugar_g,
        fiber_g: macros.fiber_g,
        sodium_mg: macros.sodium_mg,
        category_name: non_blank(record.category.as_ref())
            .unwrap_or_else(|| UNKNOWN_CATEGORY.to_owned()),
        category_code: None,
        portions: Vec::new(),
        nutrients: translated
            .iter()
            .zip(&direct)
            .map(|(t, d)| if t.id.is_some() { t } else { d }.to_amount())
            .collect(),
    }
}

/// Normalizes a search response page; each hit goes through [`normalize_food`].
///
/// Missing paging fields fall back to the requested page, the hit count on
/// this page, and zero total pages respectively.
#[must_use]
pub fn normalize_search_page(raw: &RawSearchResponse, requested_page: u32) -> SearchPage {
    let foods: Vec<NormalizedFood> = raw.foods.iter().map(normalize_food).collect();
    SearchPage {
        total_hits: raw
            .total_hits
            .unwrap_or_else(|| u64::try_from(foods.len()).unwrap_or(u64::MAX)),
        current_page: raw.current_page.unwrap_or(requested_page),
        total_pages: raw.total_pages.unwrap_or_default(),
        foods,
    }
}
