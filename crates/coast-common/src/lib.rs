//! Shared domain types for coastwatch services.
//!
//! Holds the monitored-location registry and the canonical-timezone time
//! arithmetic that anchors what "a day" means across the whole system.

pub mod location;
pub mod time;

pub use location::{Location, LocationRegistry};
pub use time::{aligned_window, RefreshWindow, TimezoneWindow};
