use fdcdb_core::{NormalizedPortion, DEFAULT_PORTION_UNIT};

use crate::types::RawFoodPortion;

/// SR Legacy sends this as the measure-unit name when the real label lives in `modifier`.
const UNDETERMINED_UNIT: &str = "undetermined";

/// Normalizes one upstream portion.
///
/// The label is the first non-blank of `portionDescription`, `modifier`, and
/// `measureUnit.name`, falling back to [`DEFAULT_PORTION_UNIT`]. A missing
/// amount means one of the unit; a missing gram weight is `0.0`.
#[must_use]
pub fn normalize_portion(raw: &RawFoodPortion) -> NormalizedPortion {
    NormalizedPortion {
        id: raw.id,
        amount: non_negative(raw.amount.unwrap_or(1.0)),
        gram_weight: non_negative(raw.gram_weight.unwrap_or(0.0)),
        unit: portion_label(raw),
    }
}

fn portion_label(raw: &RawFoodPortion) -> String {
    let measure_unit = raw
        .measure_unit
        .as_ref()
        .and_then(|unit| unit.name.as_deref())
        .filter(|name| !name.trim().eq_ignore_ascii_case(UNDETERMINED_UNIT));

    [
        raw.portion_description.as_deref(),
        raw.modifier.as_deref(),
        measure_unit,
    ]
    .into_iter()
    .flatten()
    .map(str::trim)
    .find(|label| !label.is_empty())
    .unwrap_or(DEFAULT_PORTION_UNIT)
    .to_owned()
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}
