//! Snapshot assembly engine.
//!
//! Orchestrates gap-prone metric sources into per-day snapshots: the
//! per-day assembler applies the gap-filling fallback chain, the series
//! builder runs it across a date range with lookback priming, the window
//! cache short-circuits repeated identical series requests, and the refresh
//! scheduler drives revision passes that upgrade persisted days through the
//! rank merge rule.

pub mod adapter;
pub mod assembler;
pub mod config;
pub mod error;
pub mod refresh;
pub mod series;
pub mod window_cache;

pub use adapter::{BaseMetric, MetricSourceAdapter, MetricSources};
pub use assembler::{MetricHistory, PerDayAssembler};
pub use config::EngineConfig;
pub use error::{AdapterError, AssemblyError};
pub use refresh::{RefreshResult, RefreshScheduler};
pub use series::{DailySeries, SeriesAverages, SeriesBuilder};
pub use window_cache::{CacheEntry, WindowCache};
