//! Derived-metric math: NO2 classification and the water-quality index.

use serde::{Deserialize, Serialize};

/// Air-quality class derived from tropospheric NO2 column density (mol/m²).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AirQualityClass {
    Good,
    Moderate,
    Poor,
}

impl AirQualityClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Moderate => "moderate",
            Self::Poor => "poor",
        }
    }
}

/// NO2 classification thresholds (mol/m²).
const NO2_GOOD_BELOW: f64 = 3.0e-5;
const NO2_MODERATE_BELOW: f64 = 6.0e-5;

/// Classify a filled NO2 value. Callers report "unknown" when NO2 is missing.
pub fn classify_no2(no2: f64) -> AirQualityClass {
    if no2 < NO2_GOOD_BELOW {
        AirQualityClass::Good
    } else if no2 < NO2_MODERATE_BELOW {
        AirQualityClass::Moderate
    } else {
        AirQualityClass::Poor
    }
}

fn clamp01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

/// Linear map from a "good" reference (0) to a "bad" reference (1), clamped.
fn normalize_linear(value: f64, good: f64, bad: f64) -> f64 {
    if bad == good {
        return 0.0;
    }
    clamp01((value - good) / (bad - good))
}

// Reference points calibrated against typical Mediterranean coastal ranges.
fn normalize_sst(sst: f64) -> f64 {
    normalize_linear(sst, 20.0, 30.0)
}

fn normalize_chlorophyll(chl: f64) -> f64 {
    normalize_linear(chl, 2.0, 250.0)
}

fn normalize_turbidity(ndti: f64) -> f64 {
    normalize_linear(ndti, -0.05, 0.40)
}

const SST_WEIGHT: f64 = 0.25;
const CHL_WEIGHT: f64 = 0.35;
const TURB_WEIGHT: f64 = 0.40;

/// Water-quality index on a 0–100 scale (higher is better).
///
/// Weighted combination of normalized sea temperature, chlorophyll, and
/// turbidity; weights are renormalized over whichever components are present.
/// Returns `None` when no component is available.
pub fn compute_wqi(sst: Option<f64>, chl: Option<f64>, turb: Option<f64>) -> Option<f64> {
    let mut parts: Vec<(f64, f64)> = Vec::with_capacity(3);

    if let Some(v) = sst {
        parts.push((SST_WEIGHT, normalize_sst(v)));
    }
    if let Some(v) = chl {
        parts.push((CHL_WEIGHT, normalize_chlorophyll(v)));
    }
    if let Some(v) = turb {
        parts.push((TURB_WEIGHT, normalize_turbidity(v)));
    }

    if parts.is_empty() {
        return None;
    }

    let weight_sum: f64 = parts.iter().map(|(w, _)| w).sum();
    let pollution_index: f64 = parts.iter().map(|(w, n)| (w / weight_sum) * n).sum();

    Some(round_to(100.0 * (1.0 - pollution_index), 1))
}

/// Round to the given number of decimal places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
