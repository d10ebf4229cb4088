//! Remote metric source adapters.
//!
//! Every base metric is served by the imagery-aggregation endpoint, which
//! reduces a satellite collection over a buffered point geometry and returns
//! a single mean value (or null) for a date range. The adapters here only
//! parameterize that call per metric; spatial reduction stays opaque behind
//! the remote service.

use std::sync::Arc;
use std::time::Duration;

use assembly::{AdapterError, MetricSourceAdapter, MetricSources};
use async_trait::async_trait;
use chrono::NaiveDate;
use coast_common::Location;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Dataset parameters for one metric's aggregation query.
#[derive(Debug, Clone)]
struct DatasetSpec {
    collection: &'static str,
    band: &'static str,
    /// Reduce scale in meters (native resolution of the collection).
    scale_m: u32,
    /// Buffer radius around the location point, in meters.
    buffer_m: u32,
    /// Linear transform applied to the returned value.
    value_scale: f64,
}

/// One metric's adapter against the aggregation endpoint.
pub struct RemoteStatsAdapter {
    client: Client,
    base_url: String,
    spec: DatasetSpec,
}

#[derive(Debug, Deserialize)]
struct AggregateResponse {
    value: Option<f64>,
}

#[async_trait]
impl MetricSourceAdapter for RemoteStatsAdapter {
    async fn fetch(
        &self,
        location: &Location,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<f64>, AdapterError> {
        let url = format!("{}/v1/aggregate", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("collection", self.spec.collection.to_string()),
                ("band", self.spec.band.to_string()),
                ("lat", location.lat.to_string()),
                ("lon", location.lon.to_string()),
                ("buffer_m", self.spec.buffer_m.to_string()),
                ("scale", self.spec.scale_m.to_string()),
                ("start", start.to_string()),
                ("end", end.to_string()),
            ])
            .send()
            .await
            .map_err(|e| AdapterError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AdapterError::Transport(format!(
                "aggregation endpoint returned {}",
                response.status()
            )));
        }

        let body: AggregateResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::Transport(e.to_string()))?;

        debug!(
            collection = self.spec.collection,
            location = %location.id,
            start = %start,
            end = %end,
            value = ?body.value,
            "Aggregate query complete"
        );

        Ok(body.value.map(|v| v * self.spec.value_scale))
    }
}

/// Build the full adapter set against one aggregation endpoint.
pub fn build_sources(base_url: &str) -> Result<MetricSources, AdapterError> {
    let base_url = base_url.trim().trim_end_matches('/').to_string();
    if base_url.is_empty() {
        return Err(AdapterError::Config("aggregator URL is empty".into()));
    }

    let client = Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| AdapterError::Config(e.to_string()))?;

    let adapter = |spec: DatasetSpec| -> Arc<dyn MetricSourceAdapter> {
        Arc::new(RemoteStatsAdapter {
            client: client.clone(),
            base_url: base_url.clone(),
            spec,
        })
    };

    Ok(MetricSources::new(
        // OISST is ~25km resolution and stores Celsius × 100; a wide buffer
        // avoids "no valid pixels" on coastal cells.
        adapter(DatasetSpec {
            collection: "NOAA/CDR/OISST/V2_1",
            band: "sst",
            scale_m: 25_000,
            buffer_m: 30_000,
            value_scale: 0.01,
        }),
        adapter(DatasetSpec {
            collection: "COPERNICUS/S2_SR_HARMONIZED",
            band: "NDTI",
            scale_m: 20,
            buffer_m: 3_000,
            value_scale: 1.0,
        }),
        adapter(DatasetSpec {
            collection: "COPERNICUS/S3/OLCI",
            band: "Oa08_radiance",
            scale_m: 300,
            buffer_m: 3_000,
            value_scale: 1.0,
        }),
        adapter(DatasetSpec {
            collection: "COPERNICUS/S5P/OFFL/L3_NO2",
            band: "tropospheric_NO2_column_number_density",
            scale_m: 1_000,
            buffer_m: 3_000,
            value_scale: 1.0,
        }),
        adapter(DatasetSpec {
            collection: "COPERNICUS/S2_SR_HARMONIZED",
            band: "waste_risk",
            scale_m: 20,
            buffer_m: 3_000,
            value_scale: 1.0,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_base_url_is_a_config_error() {
        let err = build_sources("   ").err();
        assert!(err.is_some());
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        assert!(build_sources("http://aggregator:9100/").is_ok());
    }
}
