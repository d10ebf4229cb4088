//! Error types for the assembly engine.

use thiserror::Error;

/// Errors surfaced by series building and refresh passes.
///
/// Missing source data is never an error here; it is modeled as an absent
/// value and handled by the gap-filling chain.
#[derive(Error, Debug)]
pub enum AssemblyError {
    /// The requested location id is not in the registry.
    #[error("unknown location: {0}")]
    UnknownLocation(String),

    /// The requested day count is not positive.
    #[error("day count must be at least 1, got {0}")]
    InvalidDayCount(i64),

    /// The day store failed while persisting a revision.
    #[error("day store error: {0}")]
    Store(#[from] day_store::StoreError),
}

/// Failures from a metric source adapter.
///
/// Callers log these and collapse them into "no data" for the affected call;
/// they are retried naturally on the next refresh pass.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// Network or remote-service failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The adapter itself is misconfigured (bad endpoint, missing dataset).
    #[error("adapter configuration error: {0}")]
    Config(String),
}
