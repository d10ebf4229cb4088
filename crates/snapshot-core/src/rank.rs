//! Provenance ranks for metric values.

use serde::{Deserialize, Serialize};

/// How a metric value was obtained, in increasing order of confidence.
///
/// The derive order matters: `Ord` on the variants is the merge rule's
/// comparison, so `Missing < Imputed < WindowAvg < Daily` must hold.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SourceRank {
    /// No value could be obtained at all.
    #[default]
    Missing,
    /// Mean of recently resolved values for the same metric (build-pass fill).
    Imputed,
    /// Aggregate over a trailing lookback window.
    WindowAvg,
    /// Direct observation for the day itself.
    Daily,
}

impl SourceRank {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Imputed => "imputed",
            Self::WindowAvg => "window_avg",
            Self::Daily => "daily",
        }
    }
}

impl std::fmt::Display for SourceRank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
