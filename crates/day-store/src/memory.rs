//! In-memory day store for tests and persistence-disabled deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use snapshot_core::DailyMetricSnapshot;
use tokio::sync::RwLock;

use crate::{overlay, DayStore, StoreError};

type Key = (String, NaiveDate);

/// A `DayStore` kept entirely in memory.
#[derive(Default)]
pub struct MemoryDayStore {
    days: RwLock<HashMap<Key, DailyMetricSnapshot>>,
}

impl MemoryDayStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored `(location, day)` documents.
    pub async fn len(&self) -> usize {
        self.days.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.days.read().await.is_empty()
    }
}

#[async_trait]
impl DayStore for MemoryDayStore {
    async fn get_day(
        &self,
        location_id: &str,
        date: NaiveDate,
    ) -> Result<Option<DailyMetricSnapshot>, StoreError> {
        let days = self.days.read().await;
        Ok(days.get(&(location_id.to_string(), date)).cloned())
    }

    async fn upsert_day(&self, snapshot: &DailyMetricSnapshot) -> Result<(), StoreError> {
        let key = (snapshot.location_id.clone(), snapshot.date);
        let mut days = self.days.write().await;
        let merged = match days.get(&key) {
            Some(stored) => overlay(stored, snapshot),
            None => snapshot.clone(),
        };
        days.insert(key, merged);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snapshot_core::{Metric, SourceRank};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[tokio::test]
    async fn upsert_then_get_roundtrips() {
        let store = MemoryDayStore::new();
        let mut snap = DailyMetricSnapshot::empty("lara", day());
        snap.sst_celsius = Metric::observed(24.5, SourceRank::Daily);

        store.upsert_day(&snap).await.unwrap();
        let loaded = store.get_day("lara", day()).await.unwrap().unwrap();
        assert_eq!(loaded, snap);
    }

    #[tokio::test]
    async fn upsert_merges_instead_of_overwriting() {
        let store = MemoryDayStore::new();

        let mut first = DailyMetricSnapshot::empty("lara", day());
        first.sst_celsius = Metric::observed(24.5, SourceRank::Daily);
        store.upsert_day(&first).await.unwrap();

        // Second write carries only turbidity; sst must survive.
        let mut second = DailyMetricSnapshot::empty("lara", day());
        second.turbidity_index = Metric::observed(-0.02, SourceRank::WindowAvg);
        store.upsert_day(&second).await.unwrap();

        let loaded = store.get_day("lara", day()).await.unwrap().unwrap();
        assert_eq!(loaded.sst_celsius.value_f64(), Some(24.5));
        assert_eq!(loaded.turbidity_index.value_f64(), Some(-0.02));
    }

    #[tokio::test]
    async fn upsert_never_downgrades_a_ranked_field() {
        let store = MemoryDayStore::new();

        let mut first = DailyMetricSnapshot::empty("lara", day());
        first.turbidity_index = Metric::observed(0.010, SourceRank::Daily);
        store.upsert_day(&first).await.unwrap();

        // A late pass carrying only a window aggregate must not replace the
        // direct observation.
        let mut second = DailyMetricSnapshot::empty("lara", day());
        second.turbidity_index = Metric::observed(-0.021, SourceRank::WindowAvg);
        store.upsert_day(&second).await.unwrap();

        let loaded = store.get_day("lara", day()).await.unwrap().unwrap();
        assert_eq!(loaded.turbidity_index.value_f64(), Some(0.010));
        assert_eq!(loaded.turbidity_index.rank(), SourceRank::Daily);
    }

    #[tokio::test]
    async fn get_days_aligns_with_input() {
        let store = MemoryDayStore::new();
        let d1 = day();
        let d2 = d1.succ_opt().unwrap();

        let mut snap = DailyMetricSnapshot::empty("lara", d2);
        snap.chlorophyll = Metric::observed(3.0, SourceRank::Daily);
        store.upsert_day(&snap).await.unwrap();

        let rows = store.get_days("lara", &[d1, d2]).await.unwrap();
        assert!(rows[0].is_none());
        assert!(rows[1].is_some());
    }
}
