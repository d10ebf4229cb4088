//! Core snapshot model for coastwatch.
//!
//! A [`DailyMetricSnapshot`] holds one location's metric values for one
//! calendar day. Every value carries a [`SourceRank`] describing how it was
//! obtained; the two always travel together as a [`Metric`] so they cannot
//! desynchronize. [`merge_if_improved`] applies the rank-based revision rule
//! that keeps persisted snapshots monotonically improving.

pub mod merge;
pub mod quality;
pub mod rank;
pub mod snapshot;

pub use merge::merge_if_improved;
pub use quality::{classify_no2, compute_wqi, round_to, AirQualityClass};
pub use rank::SourceRank;
pub use snapshot::{DailyMetricSnapshot, Metric};
