//! The per-day snapshot document.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::quality::AirQualityClass;
use crate::rank::SourceRank;

/// A metric value bundled with its provenance rank.
///
/// Constructed only through [`Metric::missing`] and [`Metric::observed`] so a
/// value and its rank are always updated together. A missing metric has no
/// value; an observed one always does.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metric<T = f64> {
    value: Option<T>,
    source: SourceRank,
}

impl<T> Metric<T> {
    pub fn missing() -> Self {
        Self {
            value: None,
            source: SourceRank::Missing,
        }
    }

    /// An obtained value. `rank` must not be `Missing`.
    pub fn observed(value: T, rank: SourceRank) -> Self {
        debug_assert!(rank > SourceRank::Missing);
        Self {
            value: Some(value),
            source: rank,
        }
    }

    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn rank(&self) -> SourceRank {
        self.source
    }

    pub fn is_missing(&self) -> bool {
        self.value.is_none()
    }
}

impl Metric<f64> {
    pub fn value_f64(&self) -> Option<f64> {
        self.value
    }
}

impl<T> Default for Metric<T> {
    fn default() -> Self {
        Self::missing()
    }
}

/// All metric values, with provenance, for one location on one calendar day.
///
/// Created fresh by the per-day assembler; afterwards only ever merged via
/// [`crate::merge_if_improved`], never wholesale overwritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyMetricSnapshot {
    pub location_id: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub sst_celsius: Metric<f64>,
    #[serde(default)]
    pub turbidity_index: Metric<f64>,
    #[serde(default)]
    pub chlorophyll: Metric<f64>,
    #[serde(default)]
    pub no2_concentration: Metric<f64>,
    #[serde(default)]
    pub air_quality_class: Metric<AirQualityClass>,
    #[serde(default)]
    pub water_quality_index: Metric<f64>,
    #[serde(default)]
    pub waste_risk_percent: Metric<f64>,
}

impl DailyMetricSnapshot {
    /// An all-missing snapshot for the given location and day.
    pub fn empty(location_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            location_id: location_id.into(),
            date,
            sst_celsius: Metric::missing(),
            turbidity_index: Metric::missing(),
            chlorophyll: Metric::missing(),
            no2_concentration: Metric::missing(),
            air_quality_class: Metric::missing(),
            water_quality_index: Metric::missing(),
            waste_risk_percent: Metric::missing(),
        }
    }

    /// True if no field holds a value.
    pub fn is_empty(&self) -> bool {
        self.sst_celsius.is_missing()
            && self.turbidity_index.is_missing()
            && self.chlorophyll.is_missing()
            && self.no2_concentration.is_missing()
            && self.air_quality_class.is_missing()
            && self.water_quality_index.is_missing()
            && self.waste_risk_percent.is_missing()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_snapshot_has_all_fields_missing() {
        let snap = DailyMetricSnapshot::empty("lara", NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert!(snap.is_empty());
        assert_eq!(snap.sst_celsius.rank(), SourceRank::Missing);
    }

    #[test]
    fn metric_roundtrips_through_json() {
        let metric = Metric::observed(21.45, SourceRank::WindowAvg);
        let json = serde_json::to_string(&metric).unwrap();
        assert!(json.contains("window_avg"));
        let back: Metric<f64> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, metric);
    }

    #[test]
    fn snapshot_deserializes_with_absent_fields() {
        // Older documents may predate a field; it must come back as missing.
        let json = r#"{"location_id":"lara","date":"2024-06-01","sst_celsius":{"value":24.1,"source":"daily"}}"#;
        let snap: DailyMetricSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snap.sst_celsius.value_f64(), Some(24.1));
        assert!(snap.waste_risk_percent.is_missing());
    }
}
