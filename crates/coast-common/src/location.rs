//! Monitored-location registry.
//!
//! Locations are loaded from a YAML file when one is provided and fall back
//! to the compiled-in default set otherwise. The registry is constructed once
//! at startup and shared; there is no runtime mutation.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// A monitored coastal location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Deserialize)]
struct LocationsFile {
    #[serde(default)]
    locations: Vec<Location>,
}

/// Registry of monitored locations, keyed by id.
///
/// Backed by a `BTreeMap` so iteration order (and therefore refresh-pass
/// order) is deterministic.
#[derive(Debug, Clone)]
pub struct LocationRegistry {
    locations: BTreeMap<String, Location>,
}

impl LocationRegistry {
    pub fn from_locations(locations: impl IntoIterator<Item = Location>) -> Self {
        Self {
            locations: locations
                .into_iter()
                .map(|loc| (loc.id.clone(), loc))
                .collect(),
        }
    }

    /// The compiled-in Antalya-coast default set.
    pub fn defaults() -> Self {
        Self::from_locations([
            Location {
                id: "konyaalti".into(),
                name: "Konyaaltı".into(),
                lat: 36.8585,
                lon: 30.6369,
            },
            Location {
                id: "lara".into(),
                name: "Lara".into(),
                lat: 36.8563,
                lon: 30.7950,
            },
            Location {
                id: "cirali".into(),
                name: "Çıralı".into(),
                lat: 36.4146,
                lon: 30.4747,
            },
            Location {
                id: "kaputas".into(),
                name: "Kaputaş".into(),
                lat: 36.2683,
                lon: 29.3592,
            },
            Location {
                id: "patara".into(),
                name: "Patara".into(),
                lat: 36.2641,
                lon: 29.3118,
            },
        ])
    }

    /// Load the registry from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read locations file {}", path.display()))?;
        let parsed: LocationsFile = serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse locations file {}", path.display()))?;

        if parsed.locations.is_empty() {
            warn!(path = %path.display(), "Locations file contains no locations");
        }

        info!(
            path = %path.display(),
            count = parsed.locations.len(),
            "Loaded location registry"
        );

        Ok(Self::from_locations(parsed.locations))
    }

    /// Load from a file if it exists, otherwise use the defaults.
    pub fn load_or_defaults(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                warn!(error = %e, "Failed to load locations file, using defaults");
                Self::defaults()
            })
        } else {
            info!(path = %path.display(), "No locations file, using built-in defaults");
            Self::defaults()
        }
    }

    pub fn get(&self, id: &str) -> Option<&Location> {
        self.locations.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.locations.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.locations.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Location> {
        self.locations.values()
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_nonempty_and_sorted() {
        let registry = LocationRegistry::defaults();
        assert!(registry.contains("konyaalti"));
        let ids: Vec<_> = registry.ids().collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn loads_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "locations:\n  - id: test-bay\n    name: Test Bay\n    lat: 36.5\n    lon: 30.1\n"
        )
        .unwrap();

        let registry = LocationRegistry::load(file.path()).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("test-bay").unwrap().name, "Test Bay");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let registry = LocationRegistry::load_or_defaults(Path::new("/nonexistent/locations.yaml"));
        assert!(!registry.is_empty());
    }
}
