//! Per-day snapshot persistence.
//!
//! One document per `(location, day)`. Writes are rank-aware field-level
//! merges: an incoming field replaces the stored one only when it carries a
//! strictly higher rank, so a failure partway through assembly cannot
//! corrupt previously merged fields and overlapping refresh passes cannot
//! downgrade confidence.

pub mod error;
pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::NaiveDate;
use snapshot_core::DailyMetricSnapshot;

pub use error::StoreError;
pub use memory::MemoryDayStore;
pub use sqlite::SqliteDayStore;

/// Storage backend for daily snapshots.
#[async_trait]
pub trait DayStore: Send + Sync {
    /// Fetch the persisted snapshot for one day, if any.
    async fn get_day(
        &self,
        location_id: &str,
        date: NaiveDate,
    ) -> Result<Option<DailyMetricSnapshot>, StoreError>;

    /// Fetch several days at once; the result aligns with the input dates.
    async fn get_days(
        &self,
        location_id: &str,
        dates: &[NaiveDate],
    ) -> Result<Vec<Option<DailyMetricSnapshot>>, StoreError> {
        let mut out = Vec::with_capacity(dates.len());
        for &date in dates {
            out.push(self.get_day(location_id, date).await?);
        }
        Ok(out)
    }

    /// Write a snapshot with field-level merge semantics and stamp the
    /// update time.
    async fn upsert_day(&self, snapshot: &DailyMetricSnapshot) -> Result<(), StoreError>;
}

/// Rank-aware field-level merge of an incoming snapshot over a stored one.
///
/// An incoming field replaces the stored one only at a strictly higher rank;
/// ties and regressions keep the stored value. A missing incoming field has
/// the lowest rank and is therefore always withheld. This makes the write
/// path itself monotonic and idempotent, independent of merging done
/// upstream.
pub(crate) fn overlay(
    stored: &DailyMetricSnapshot,
    incoming: &DailyMetricSnapshot,
) -> DailyMetricSnapshot {
    macro_rules! pick {
        ($field:ident) => {
            if incoming.$field.rank() > stored.$field.rank() {
                incoming.$field.clone()
            } else {
                stored.$field.clone()
            }
        };
    }

    DailyMetricSnapshot {
        location_id: stored.location_id.clone(),
        date: stored.date,
        sst_celsius: pick!(sst_celsius),
        turbidity_index: pick!(turbidity_index),
        chlorophyll: pick!(chlorophyll),
        no2_concentration: pick!(no2_concentration),
        air_quality_class: pick!(air_quality_class),
        water_quality_index: pick!(water_quality_index),
        waste_risk_percent: pick!(waste_risk_percent),
    }
}
