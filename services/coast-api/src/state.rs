//! Shared application state.

use std::sync::Arc;

use assembly::{DailySeries, EngineConfig, RefreshScheduler, SeriesBuilder, WindowCache};
use coast_common::{LocationRegistry, TimezoneWindow};

/// How many distinct `(op, location, days, window)` payloads the response
/// cache retains before LRU eviction.
const CACHE_CAPACITY: usize = 256;

/// State shared by all request handlers.
pub struct AppState {
    pub registry: Arc<LocationRegistry>,
    pub builder: Arc<SeriesBuilder>,
    pub scheduler: Arc<RefreshScheduler>,
    pub cache: WindowCache<DailySeries>,
    pub tz: TimezoneWindow,
    /// Shared secret for the admin refresh trigger; `None` disables it.
    pub admin_token: Option<String>,
}

impl AppState {
    pub fn new(
        registry: Arc<LocationRegistry>,
        builder: Arc<SeriesBuilder>,
        scheduler: Arc<RefreshScheduler>,
        config: &EngineConfig,
        tz: TimezoneWindow,
        admin_token: Option<String>,
    ) -> Self {
        Self {
            registry,
            builder,
            scheduler,
            cache: WindowCache::new(config.cache_window_days, CACHE_CAPACITY),
            tz,
            admin_token,
        }
    }
}
