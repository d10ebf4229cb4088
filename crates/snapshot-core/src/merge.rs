//! Rank-based revision merging.
//!
//! Revision passes re-assemble recent days and call [`merge_if_improved`] to
//! reconcile with what is already persisted. A field is only replaced when
//! the incoming rank is strictly greater than the stored one, so confidence
//! is monotonic over time and re-running the same inputs is a no-op.

use crate::snapshot::{DailyMetricSnapshot, Metric};

fn take_better<T: Clone + PartialEq>(
    stored: &Metric<T>,
    incoming: &Metric<T>,
    changed: &mut bool,
) -> Metric<T> {
    if incoming.rank() > stored.rank() {
        *changed = true;
        incoming.clone()
    } else {
        // Ties and regressions keep the stored value, even if it differs
        // numerically from the incoming one.
        stored.clone()
    }
}

/// Merge a newly assembled snapshot into the persisted one, if any.
///
/// Returns the merged snapshot and whether any field actually changed. With
/// no persisted snapshot the incoming one is accepted as-is.
pub fn merge_if_improved(
    existing: Option<&DailyMetricSnapshot>,
    incoming: &DailyMetricSnapshot,
) -> (DailyMetricSnapshot, bool) {
    let existing = match existing {
        Some(existing) => existing,
        None => return (incoming.clone(), true),
    };

    let mut changed = false;
    let merged = DailyMetricSnapshot {
        location_id: existing.location_id.clone(),
        date: existing.date,
        sst_celsius: take_better(&existing.sst_celsius, &incoming.sst_celsius, &mut changed),
        turbidity_index: take_better(
            &existing.turbidity_index,
            &incoming.turbidity_index,
            &mut changed,
        ),
        chlorophyll: take_better(&existing.chlorophyll, &incoming.chlorophyll, &mut changed),
        no2_concentration: take_better(
            &existing.no2_concentration,
            &incoming.no2_concentration,
            &mut changed,
        ),
        air_quality_class: take_better(
            &existing.air_quality_class,
            &incoming.air_quality_class,
            &mut changed,
        ),
        water_quality_index: take_better(
            &existing.water_quality_index,
            &incoming.water_quality_index,
            &mut changed,
        ),
        waste_risk_percent: take_better(
            &existing.waste_risk_percent,
            &incoming.waste_risk_percent,
            &mut changed,
        ),
    };

    (merged, changed)
}
