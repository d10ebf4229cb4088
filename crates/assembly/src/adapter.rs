//! Metric source adapters.
//!
//! Each base metric is retrieved through a [`MetricSourceAdapter`], typically
//! wrapping a remote imagery/measurement API. Adapters return `Ok(None)` for
//! genuine no-data and may only error for transport or configuration
//! failures, which the assembler logs and treats as no-data for that call.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use coast_common::Location;

use crate::error::AdapterError;

/// The directly queried metrics, each behind its own adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseMetric {
    SeaSurfaceTemp,
    Turbidity,
    Chlorophyll,
    No2,
    WasteRisk,
}

impl BaseMetric {
    pub const ALL: [BaseMetric; 5] = [
        Self::SeaSurfaceTemp,
        Self::Turbidity,
        Self::Chlorophyll,
        Self::No2,
        Self::WasteRisk,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SeaSurfaceTemp => "sst",
            Self::Turbidity => "turbidity",
            Self::Chlorophyll => "chlorophyll",
            Self::No2 => "no2",
            Self::WasteRisk => "waste_risk",
        }
    }

    /// Decimal places the serialized value is rounded to, if any.
    pub fn decimals(&self) -> Option<u32> {
        match self {
            Self::SeaSurfaceTemp => Some(2),
            Self::Turbidity | Self::Chlorophyll => Some(4),
            Self::No2 => None,
            Self::WasteRisk => Some(1),
        }
    }
}

impl std::fmt::Display for BaseMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single-metric aggregate query over a half-open date range.
#[async_trait]
pub trait MetricSourceAdapter: Send + Sync {
    /// Aggregate value for `[start, end)` at the location, or `None` when
    /// the source has no usable observation in that range.
    async fn fetch(
        &self,
        location: &Location,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<f64>, AdapterError>;
}

/// The full adapter set, one per base metric.
#[derive(Clone)]
pub struct MetricSources {
    adapters: HashMap<BaseMetric, Arc<dyn MetricSourceAdapter>>,
}

impl MetricSources {
    pub fn new(
        sst: Arc<dyn MetricSourceAdapter>,
        turbidity: Arc<dyn MetricSourceAdapter>,
        chlorophyll: Arc<dyn MetricSourceAdapter>,
        no2: Arc<dyn MetricSourceAdapter>,
        waste_risk: Arc<dyn MetricSourceAdapter>,
    ) -> Self {
        let mut adapters: HashMap<BaseMetric, Arc<dyn MetricSourceAdapter>> = HashMap::new();
        adapters.insert(BaseMetric::SeaSurfaceTemp, sst);
        adapters.insert(BaseMetric::Turbidity, turbidity);
        adapters.insert(BaseMetric::Chlorophyll, chlorophyll);
        adapters.insert(BaseMetric::No2, no2);
        adapters.insert(BaseMetric::WasteRisk, waste_risk);
        Self { adapters }
    }

    /// Every metric served by the same adapter. Mostly useful in tests.
    pub fn uniform(adapter: Arc<dyn MetricSourceAdapter>) -> Self {
        Self {
            adapters: BaseMetric::ALL
                .into_iter()
                .map(|m| (m, adapter.clone()))
                .collect(),
        }
    }

    pub fn adapter(&self, metric: BaseMetric) -> &Arc<dyn MetricSourceAdapter> {
        &self.adapters[&metric]
    }
}
