//! Series building across a date range.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use coast_common::LocationRegistry;
use day_store::DayStore;
use serde::Serialize;
use snapshot_core::{round_to, DailyMetricSnapshot};
use tracing::{debug, warn};

use crate::assembler::{MetricHistory, PerDayAssembler};
use crate::config::EngineConfig;
use crate::error::AssemblyError;

/// An ordered run of daily snapshots plus simple averages.
#[derive(Debug, Clone, Serialize)]
pub struct DailySeries {
    pub location_id: String,
    pub days: u32,
    pub series: Vec<DailyMetricSnapshot>,
    pub averages: SeriesAverages,
}

/// Per-metric arithmetic means over the returned series, ignoring missing
/// values. An average is absent only when every value in the series is.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesAverages {
    pub sst_celsius: Option<f64>,
    pub turbidity_index: Option<f64>,
    pub chlorophyll: Option<f64>,
    pub no2_concentration: Option<f64>,
    pub water_quality_index: Option<f64>,
    pub waste_risk_percent: Option<f64>,
}

/// Builds N-day series ending at an anchor day, priming the gap-filling
/// fallbacks with an internal lookback margin.
pub struct SeriesBuilder {
    registry: Arc<LocationRegistry>,
    assembler: PerDayAssembler,
    store: Arc<dyn DayStore>,
    config: EngineConfig,
}

impl SeriesBuilder {
    pub fn new(
        registry: Arc<LocationRegistry>,
        assembler: PerDayAssembler,
        store: Arc<dyn DayStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            registry,
            assembler,
            store,
            config,
        }
    }

    /// Build a series for a request, preferring persisted snapshots and
    /// assembling only the days the store misses.
    pub async fn build(
        &self,
        location_id: &str,
        days: u32,
        anchor: NaiveDate,
    ) -> Result<DailySeries, AssemblyError> {
        self.build_inner(location_id, days, anchor, true).await
    }

    /// Build a series by re-assembling every day from the sources, ignoring
    /// the store. Refresh passes use this so the merger can observe upgrades.
    pub async fn assemble_fresh(
        &self,
        location_id: &str,
        days: u32,
        anchor: NaiveDate,
    ) -> Result<DailySeries, AssemblyError> {
        self.build_inner(location_id, days, anchor, false).await
    }

    async fn build_inner(
        &self,
        location_id: &str,
        days: u32,
        anchor: NaiveDate,
        prefer_store: bool,
    ) -> Result<DailySeries, AssemblyError> {
        // Validation happens before any external call.
        if days == 0 {
            return Err(AssemblyError::InvalidDayCount(0));
        }
        let location = self
            .registry
            .get(location_id)
            .ok_or_else(|| AssemblyError::UnknownLocation(location_id.to_string()))?
            .clone();

        // Assemble an extra lookback margin so even the earliest requested
        // day has history to draw on, then return only the tail.
        let lookback = self.config.lookback_days;
        let total = days + lookback;
        let first_day = anchor - Duration::days(i64::from(total) - 1);
        let dates: Vec<NaiveDate> = (0..total)
            .map(|i| first_day + Duration::days(i64::from(i)))
            .collect();

        let persisted = if prefer_store {
            match self.store.get_days(&location.id, &dates).await {
                Ok(persisted) => persisted,
                Err(e) => {
                    warn!(location = %location.id, error = %e, "Day store read failed, assembling fresh");
                    vec![None; dates.len()]
                }
            }
        } else {
            vec![None; dates.len()]
        };

        let mut history = MetricHistory::new(lookback);
        let mut series = Vec::with_capacity(dates.len());

        for (day, stored) in dates.iter().zip(persisted) {
            let snapshot = match stored {
                Some(snapshot) => {
                    debug!(location = %location.id, date = %day, "Using persisted snapshot");
                    snapshot
                }
                None => self.assembler.assemble_day(&location, *day, &history).await,
            };
            history.record(&snapshot);
            series.push(snapshot);
        }

        let tail: Vec<DailyMetricSnapshot> = series.split_off(lookback as usize);
        let averages = SeriesAverages::over(&tail);

        Ok(DailySeries {
            location_id: location.id,
            days,
            series: tail,
            averages,
        })
    }
}

impl SeriesAverages {
    fn over(series: &[DailyMetricSnapshot]) -> Self {
        Self {
            sst_celsius: mean(series.iter().map(|s| s.sst_celsius.value_f64()))
                .map(|v| round_to(v, 2)),
            turbidity_index: mean(series.iter().map(|s| s.turbidity_index.value_f64()))
                .map(|v| round_to(v, 4)),
            chlorophyll: mean(series.iter().map(|s| s.chlorophyll.value_f64()))
                .map(|v| round_to(v, 4)),
            no2_concentration: mean(series.iter().map(|s| s.no2_concentration.value_f64())),
            water_quality_index: mean(series.iter().map(|s| s.water_quality_index.value_f64()))
                .map(|v| round_to(v, 1)),
            waste_risk_percent: mean(series.iter().map(|s| s.waste_risk_percent.value_f64()))
                .map(|v| round_to(v, 1)),
        }
    }
}

fn mean(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let present: Vec<f64> = values.flatten().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().sum::<f64>() / present.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::MetricSources;
    use crate::error::AdapterError;
    use crate::MetricSourceAdapter;
    use async_trait::async_trait;
    use coast_common::Location;
    use day_store::MemoryDayStore;
    use snapshot_core::{Metric, SourceRank};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry() -> Arc<LocationRegistry> {
        Arc::new(LocationRegistry::from_locations([Location {
            id: "lara".into(),
            name: "Lara".into(),
            lat: 36.8563,
            lon: 30.7950,
        }]))
    }

    fn anchor() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
    }

    /// Returns a fixed value for every direct query, counting calls.
    struct Constant {
        value: Option<f64>,
        calls: AtomicUsize,
    }

    impl Constant {
        fn new(value: Option<f64>) -> Arc<Self> {
            Arc::new(Self {
                value,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl MetricSourceAdapter for Constant {
        async fn fetch(
            &self,
            _location: &Location,
            _start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Option<f64>, AdapterError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Ok(self.value)
        }
    }

    fn builder(adapter: Arc<Constant>, store: Arc<dyn DayStore>) -> SeriesBuilder {
        let config = EngineConfig::default();
        let assembler =
            PerDayAssembler::new(Arc::new(MetricSources::uniform(adapter)), config.clone());
        SeriesBuilder::new(registry(), assembler, store, config)
    }

    #[tokio::test]
    async fn returns_exactly_the_requested_days() {
        let builder = builder(Constant::new(Some(25.0)), Arc::new(MemoryDayStore::new()));
        let series = builder.build("lara", 7, anchor()).await.unwrap();

        assert_eq!(series.series.len(), 7);
        assert_eq!(series.series.first().unwrap().date, anchor() - Duration::days(6));
        assert_eq!(series.series.last().unwrap().date, anchor());
    }

    #[tokio::test]
    async fn rejects_unknown_location_before_any_call() {
        let adapter = Constant::new(Some(25.0));
        let builder = builder(adapter.clone(), Arc::new(MemoryDayStore::new()));

        let err = builder.build("atlantis", 7, anchor()).await.unwrap_err();
        assert!(matches!(err, AssemblyError::UnknownLocation(_)));
        assert_eq!(adapter.calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn rejects_zero_days_before_any_call() {
        let adapter = Constant::new(Some(25.0));
        let builder = builder(adapter.clone(), Arc::new(MemoryDayStore::new()));

        let err = builder.build("lara", 0, anchor()).await.unwrap_err();
        assert!(matches!(err, AssemblyError::InvalidDayCount(0)));
        assert_eq!(adapter.calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn averages_ignore_missing_values() {
        let store = Arc::new(MemoryDayStore::new());

        // Persist one day with a value; leave the sources dark so every
        // other day comes back missing.
        let mut snap = DailyMetricSnapshot::empty("lara", anchor());
        snap.sst_celsius = Metric::observed(24.0, SourceRank::Daily);
        store.upsert_day(&snap).await.unwrap();

        let builder = builder(Constant::new(None), store);
        let series = builder.build("lara", 3, anchor()).await.unwrap();

        assert_eq!(series.averages.sst_celsius, Some(24.0));
        // Nothing anywhere for turbidity.
        assert_eq!(series.averages.turbidity_index, None);
    }

    #[tokio::test]
    async fn persisted_days_skip_assembly() {
        let store = Arc::new(MemoryDayStore::new());
        let lookback = EngineConfig::default().lookback_days;

        // Persist the whole range including the lookback margin.
        let total = 3 + lookback;
        for i in 0..total {
            let date = anchor() - Duration::days(i64::from(total - 1 - i));
            let mut snap = DailyMetricSnapshot::empty("lara", date);
            snap.sst_celsius = Metric::observed(20.0, SourceRank::Daily);
            store.upsert_day(&snap).await.unwrap();
        }

        let adapter = Constant::new(Some(99.0));
        let builder = builder(adapter.clone(), store);
        let series = builder.build("lara", 3, anchor()).await.unwrap();

        assert_eq!(adapter.calls.load(Ordering::Relaxed), 0);
        assert!(series
            .series
            .iter()
            .all(|s| s.sst_celsius.value_f64() == Some(20.0)));
    }

    #[tokio::test]
    async fn fresh_assembly_ignores_the_store() {
        let store = Arc::new(MemoryDayStore::new());
        let mut snap = DailyMetricSnapshot::empty("lara", anchor());
        snap.sst_celsius = Metric::observed(20.0, SourceRank::Daily);
        store.upsert_day(&snap).await.unwrap();

        let builder = builder(Constant::new(Some(26.0)), store);
        let series = builder.assemble_fresh("lara", 1, anchor()).await.unwrap();

        assert_eq!(series.series[0].sst_celsius.value_f64(), Some(26.0));
    }
}
