//! Per-day snapshot assembly with the gap-filling fallback chain.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use coast_common::Location;
use snapshot_core::{classify_no2, compute_wqi, round_to, DailyMetricSnapshot, Metric, SourceRank};
use tracing::{debug, warn};

use crate::adapter::{BaseMetric, MetricSources};
use crate::config::EngineConfig;

/// Recently resolved values per metric, fed forward within one build pass so
/// the imputed fallback has something to average.
#[derive(Debug, Default)]
pub struct MetricHistory {
    per_metric: HashMap<BaseMetric, VecDeque<f64>>,
    cap: usize,
}

impl MetricHistory {
    pub fn new(lookback_days: u32) -> Self {
        Self {
            per_metric: HashMap::new(),
            cap: lookback_days.max(1) as usize,
        }
    }

    pub fn push(&mut self, metric: BaseMetric, value: f64) {
        let values = self.per_metric.entry(metric).or_default();
        values.push_back(value);
        while values.len() > self.cap {
            values.pop_front();
        }
    }

    /// Arithmetic mean of the retained values, if any.
    pub fn mean(&self, metric: BaseMetric) -> Option<f64> {
        let values = self.per_metric.get(&metric)?;
        if values.is_empty() {
            return None;
        }
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }

    /// Feed a resolved day's base-metric values into the history.
    pub fn record(&mut self, snapshot: &DailyMetricSnapshot) {
        if let Some(v) = snapshot.sst_celsius.value_f64() {
            self.push(BaseMetric::SeaSurfaceTemp, v);
        }
        if let Some(v) = snapshot.turbidity_index.value_f64() {
            self.push(BaseMetric::Turbidity, v);
        }
        if let Some(v) = snapshot.chlorophyll.value_f64() {
            self.push(BaseMetric::Chlorophyll, v);
        }
        if let Some(v) = snapshot.no2_concentration.value_f64() {
            self.push(BaseMetric::No2, v);
        }
        if let Some(v) = snapshot.waste_risk_percent.value_f64() {
            self.push(BaseMetric::WasteRisk, v);
        }
    }
}

/// Assembles one location+day snapshot from the metric sources.
#[derive(Clone)]
pub struct PerDayAssembler {
    sources: Arc<MetricSources>,
    config: EngineConfig,
}

impl PerDayAssembler {
    pub fn new(sources: Arc<MetricSources>, config: EngineConfig) -> Self {
        Self { sources, config }
    }

    /// Assemble the snapshot for one day.
    ///
    /// Base metrics are queried concurrently; a transport failure on one
    /// source never prevents assembly of the others. Derived fields are
    /// computed from the filled values.
    pub async fn assemble_day(
        &self,
        location: &Location,
        day: NaiveDate,
        history: &MetricHistory,
    ) -> DailyMetricSnapshot {
        let (sst, turbidity, chlorophyll, no2, waste_risk) = tokio::join!(
            self.resolve(BaseMetric::SeaSurfaceTemp, location, day, history),
            self.resolve(BaseMetric::Turbidity, location, day, history),
            self.resolve(BaseMetric::Chlorophyll, location, day, history),
            self.resolve(BaseMetric::No2, location, day, history),
            self.resolve(BaseMetric::WasteRisk, location, day, history),
        );

        let mut snapshot = DailyMetricSnapshot::empty(location.id.clone(), day);
        snapshot.sst_celsius = sst;
        snapshot.turbidity_index = turbidity;
        snapshot.chlorophyll = chlorophyll;
        snapshot.no2_concentration = no2;

        // Air class is re-derived from the filled NO2 value; its rank follows
        // the value it came from.
        snapshot.air_quality_class = match snapshot.no2_concentration.value_f64() {
            Some(v) => Metric::observed(classify_no2(v), snapshot.no2_concentration.rank()),
            None => Metric::missing(),
        };

        snapshot.water_quality_index = derive_wqi(
            &snapshot.sst_celsius,
            &snapshot.chlorophyll,
            &snapshot.turbidity_index,
        );
        snapshot.waste_risk_percent = waste_risk;

        snapshot
    }

    /// Resolve one base metric through the fallback chain:
    /// direct day query, trailing-window query, in-pass imputation, missing.
    async fn resolve(
        &self,
        metric: BaseMetric,
        location: &Location,
        day: NaiveDate,
        history: &MetricHistory,
    ) -> Metric<f64> {
        let direct = self
            .query(metric, location, day, day + Duration::days(1))
            .await;
        if let Some(value) = direct {
            return Metric::observed(self.rounded(metric, value), SourceRank::Daily);
        }

        if !self.config.fill_gaps_enabled {
            return Metric::missing();
        }

        // Trailing lookback window ending on the requested day, inclusive.
        let lookback = i64::from(self.config.lookback_days);
        let window_start = day - Duration::days(lookback - 1);
        if let Some(value) = self
            .query(metric, location, window_start, day + Duration::days(1))
            .await
        {
            return Metric::observed(self.rounded(metric, value), SourceRank::WindowAvg);
        }

        if let Some(value) = history.mean(metric) {
            debug!(
                location = %location.id,
                metric = %metric,
                date = %day,
                "Imputed from in-pass history"
            );
            return Metric::observed(self.rounded(metric, value), SourceRank::Imputed);
        }

        Metric::missing()
    }

    /// One adapter call; transport/config failures collapse to no-data.
    async fn query(
        &self,
        metric: BaseMetric,
        location: &Location,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Option<f64> {
        match self
            .sources
            .adapter(metric)
            .fetch(location, start, end)
            .await
        {
            Ok(value) => value,
            Err(e) => {
                warn!(
                    location = %location.id,
                    metric = %metric,
                    start = %start,
                    end = %end,
                    error = %e,
                    "Metric source failed, treating as no data"
                );
                None
            }
        }
    }

    fn rounded(&self, metric: BaseMetric, value: f64) -> f64 {
        match metric.decimals() {
            Some(decimals) => round_to(value, decimals),
            None => value,
        }
    }
}

/// WQI over whichever components are present; its rank is the minimum rank
/// among the contributing components.
fn derive_wqi(sst: &Metric<f64>, chl: &Metric<f64>, turb: &Metric<f64>) -> Metric<f64> {
    let value = compute_wqi(sst.value_f64(), chl.value_f64(), turb.value_f64());
    match value {
        Some(wqi) => {
            let rank = [sst, chl, turb]
                .into_iter()
                .filter(|m| !m.is_missing())
                .map(|m| m.rank())
                .min()
                .unwrap_or(SourceRank::Missing);
            Metric::observed(wqi, rank)
        }
        None => Metric::missing(),
    }
}
