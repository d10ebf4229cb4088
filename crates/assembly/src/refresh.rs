//! Refresh passes and the periodic midnight driver.
//!
//! A refresh pass re-assembles the trailing days of a location's series from
//! the sources and merges each day into the store through the rank rule.
//! The periodic driver runs one full pass shortly after startup, then wakes
//! at every local midnight; failures are isolated per location and an
//! all-failed pass backs off briefly instead of waiting a day.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use coast_common::{LocationRegistry, TimezoneWindow};
use day_store::DayStore;
use serde::Serialize;
use snapshot_core::merge_if_improved;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::config::EngineConfig;
use crate::error::AssemblyError;
use crate::series::SeriesBuilder;

const STARTUP_DELAY: Duration = Duration::from_millis(500);
const FAILURE_BACKOFF: Duration = Duration::from_secs(2);
/// Slack past midnight so the new local day is unambiguous.
const MIDNIGHT_SLACK: Duration = Duration::from_millis(250);

/// Per-location, per-pass summary of what a refresh changed.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshResult {
    pub location_id: String,
    pub as_of_day: NaiveDate,
    pub revise_days: u32,
    pub created: u32,
    pub updated: u32,
}

/// Drives refresh passes, on demand and on a midnight schedule.
pub struct RefreshScheduler {
    builder: Arc<SeriesBuilder>,
    store: Arc<dyn DayStore>,
    registry: Arc<LocationRegistry>,
    tz: TimezoneWindow,
    config: EngineConfig,
}

impl RefreshScheduler {
    pub fn new(
        builder: Arc<SeriesBuilder>,
        store: Arc<dyn DayStore>,
        registry: Arc<LocationRegistry>,
        tz: TimezoneWindow,
        config: EngineConfig,
    ) -> Self {
        Self {
            builder,
            store,
            registry,
            tz,
            config,
        }
    }

    /// Refresh one location: assemble `series_days` ending at `as_of_day`
    /// fresh from the sources, then merge the trailing `revise_days` into
    /// the store.
    pub async fn refresh_location(
        &self,
        location_id: &str,
        as_of_day: NaiveDate,
        series_days: u32,
        revise_days: u32,
    ) -> Result<RefreshResult, AssemblyError> {
        let series = self
            .builder
            .assemble_fresh(location_id, series_days.max(revise_days).max(1), as_of_day)
            .await?;

        let skip = series.series.len().saturating_sub(revise_days as usize);
        let tail = &series.series[skip..];

        let mut created = 0u32;
        let mut updated = 0u32;

        for snapshot in tail {
            let existing = self.store.get_day(location_id, snapshot.date).await?;
            let (merged, changed) = merge_if_improved(existing.as_ref(), snapshot);

            match existing {
                None => {
                    created += 1;
                    self.store.upsert_day(&merged).await?;
                }
                Some(_) if changed => {
                    updated += 1;
                    self.store.upsert_day(&merged).await?;
                }
                Some(_) => {}
            }
        }

        info!(
            location = %location_id,
            as_of = %as_of_day,
            created,
            updated,
            "Refresh pass complete"
        );

        Ok(RefreshResult {
            location_id: location_id.to_string(),
            as_of_day,
            revise_days,
            created,
            updated,
        })
    }

    /// Refresh every registered location, continuing past per-location
    /// failures. Results align with registry order.
    pub async fn refresh_all(
        &self,
        as_of_day: NaiveDate,
    ) -> Vec<(String, Result<RefreshResult, AssemblyError>)> {
        let series_days = self.config.revise_days.max(1);
        let revise_days = self.config.revise_days;

        let mut results = Vec::with_capacity(self.registry.len());
        for location_id in self.registry.ids() {
            let result = self
                .refresh_location(location_id, as_of_day, series_days, revise_days)
                .await;
            if let Err(e) = &result {
                error!(location = %location_id, error = %e, "Location refresh failed");
            }
            results.push((location_id.to_string(), result));
        }
        results
    }

    /// Run the periodic driver until a shutdown signal arrives.
    ///
    /// Wakes once shortly after start, runs a full pass, then sleeps until
    /// the next local midnight. A pass in which every location failed is
    /// retried after a short backoff.
    pub async fn run_forever(&self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.refresh_enabled {
            info!("Periodic refresh disabled by configuration");
            return;
        }

        tokio::select! {
            _ = shutdown.recv() => return,
            _ = tokio::time::sleep(STARTUP_DELAY) => {}
        }

        loop {
            let as_of = self.tz.local_today(Utc::now());
            let results = self.refresh_all(as_of).await;
            let failed = results.iter().filter(|(_, r)| r.is_err()).count();

            info!(
                as_of = %as_of,
                locations = results.len(),
                failed,
                "Scheduled refresh pass finished"
            );

            let sleep_for = if !results.is_empty() && failed == results.len() {
                warn!("Every location failed, backing off before retry");
                FAILURE_BACKOFF
            } else {
                let next_midnight = self.tz.next_local_midnight(Utc::now());
                let until = (next_midnight - Utc::now())
                    .to_std()
                    .unwrap_or(Duration::ZERO);
                until + MIDNIGHT_SLACK
            };

            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Shutting down refresh scheduler");
                    break;
                }
                _ = tokio::time::sleep(sleep_for) => {}
            }
        }
    }
}
