//! Signal Catalog
//!
//! Bidirectional mapping between application sensor names ("power",
//! "cadence") and the bus-level `(message, signal)` pairs of the message
//! dictionary.
//!
//! The configuration carries two tables:
//!
//! ```json
//! {
//!   "sensors": { "power": { "message": "PowerMeter", "signal": "Power" } },
//!   "signals": { "PowerMeter": { "Power": { "sensor": "power" },
//!                                "Balance": { "sensor": null } } }
//! }
//! ```
//!
//! Signals mapped to `null` are intentionally not surfaced.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::codec::MessageDictionary;
use crate::config::ConfigError;

/// A `(message, signal)` pair in the message dictionary
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SignalRef {
    /// Message name
    pub message: String,
    /// Signal name within the message
    pub signal: String,
}

impl SignalRef {
    /// Create a reference
    pub fn new(message: impl Into<String>, signal: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            signal: signal.into(),
        }
    }
}

impl fmt::Display for SignalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.message, self.signal)
    }
}

/// Entry of the signal → sensor table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalEntry {
    /// Sensor name, or `None` when the signal is not surfaced
    #[serde(default)]
    pub sensor: Option<String>,
}

/// On-disk catalog configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Sensor name to `(message, signal)`
    #[serde(default)]
    pub sensors: BTreeMap<String, SignalRef>,
    /// Message name to signal name to sensor
    #[serde(default)]
    pub signals: BTreeMap<String, BTreeMap<String, SignalEntry>>,
}

/// Read-only lookup tables built once at startup
#[derive(Debug, Clone, Default)]
pub struct SignalCatalog {
    by_sensor: HashMap<String, SignalRef>,
    by_signal: HashMap<String, HashMap<String, String>>,
}

impl SignalCatalog {
    /// Build the catalog, dropping null mappings and rejecting an empty or
    /// self-contradicting configuration.
    pub fn from_config(config: CatalogConfig) -> Result<Self, ConfigError> {
        let mut by_signal: HashMap<String, HashMap<String, String>> = HashMap::new();
        for (message, signals) in config.signals {
            for (signal, entry) in signals {
                if let Some(sensor) = entry.sensor {
                    by_signal
                        .entry(message.clone())
                        .or_default()
                        .insert(signal, sensor);
                }
            }
        }

        let by_sensor: HashMap<String, SignalRef> = config.sensors.into_iter().collect();

        for (sensor, target) in &by_sensor {
            let reverse = by_signal
                .get(&target.message)
                .and_then(|signals| signals.get(&target.signal));
            if let Some(other) = reverse {
                if other != sensor {
                    return Err(ConfigError::CatalogConflict {
                        sensor: sensor.clone(),
                        message: target.message.clone(),
                        signal: target.signal.clone(),
                        other: other.clone(),
                    });
                }
            }
        }

        let catalog = Self {
            by_sensor,
            by_signal,
        };
        if catalog.is_empty() {
            return Err(ConfigError::EmptyCatalog);
        }
        Ok(catalog)
    }

    /// Parse the catalog from a JSON string
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: CatalogConfig =
            serde_json::from_str(content).map_err(|source| ConfigError::ParseError {
                path: "<inline>".to_string(),
                source,
            })?;
        Self::from_config(config)
    }

    /// Load the catalog from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::IoError {
            path: path.display().to_string(),
            source,
        })?;
        let config: CatalogConfig =
            serde_json::from_str(&content).map_err(|source| ConfigError::ParseError {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_config(config)
    }

    /// Bus target for a sensor name
    pub fn signal_for(&self, sensor: &str) -> Option<&SignalRef> {
        self.by_sensor.get(sensor)
    }

    /// Sensor name for a decoded signal; `None` for unknown or null-mapped
    /// signals alike
    pub fn sensor_for(&self, message: &str, signal: &str) -> Option<&str> {
        self.by_signal
            .get(message)
            .and_then(|signals| signals.get(signal))
            .map(String::as_str)
    }

    /// Sensor names that can be written to the bus, sorted
    pub fn sensors(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_sensor.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Whether neither direction has any mapping
    pub fn is_empty(&self) -> bool {
        self.by_sensor.is_empty() && self.by_signal.values().all(HashMap::is_empty)
    }

    /// Catalog targets that the dictionary does not know, sorted.
    ///
    /// These never match at runtime; callers log them at startup.
    pub fn unresolved<D: MessageDictionary + ?Sized>(&self, dictionary: &D) -> Vec<SignalRef> {
        let known = |target: &SignalRef| {
            dictionary
                .signal_names(&target.message)
                .is_some_and(|names| names.contains(&target.signal.as_str()))
        };

        let mut missing: Vec<SignalRef> = self
            .by_sensor
            .values()
            .cloned()
            .chain(self.by_signal.iter().flat_map(|(message, signals)| {
                signals
                    .keys()
                    .map(move |signal| SignalRef::new(message.clone(), signal.clone()))
            }))
            .filter(|target| !known(target))
            .collect();
        missing.sort();
        missing.dedup();
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{MessageDef, SignalDatabase, SignalDef, SignalType};

    const CATALOG: &str = r#"{
        "sensors": {
            "power": { "message": "PowerMeter", "signal": "Power" },
            "cadence": { "message": "PowerMeter", "signal": "Cadence" }
        },
        "signals": {
            "PowerMeter": {
                "Power": { "sensor": "power" },
                "Cadence": { "sensor": "cadence" },
                "Balance": { "sensor": null }
            }
        }
    }"#;

    #[test]
    fn test_lookup_both_directions() {
        let catalog = SignalCatalog::from_json(CATALOG).unwrap();
        assert_eq!(
            catalog.signal_for("power"),
            Some(&SignalRef::new("PowerMeter", "Power"))
        );
        assert_eq!(catalog.sensor_for("PowerMeter", "Cadence"), Some("cadence"));
        assert_eq!(catalog.sensors(), vec!["cadence", "power"]);
    }

    #[test]
    fn test_null_and_unknown_are_not_found() {
        let catalog = SignalCatalog::from_json(CATALOG).unwrap();
        assert_eq!(catalog.sensor_for("PowerMeter", "Balance"), None);
        assert_eq!(catalog.sensor_for("PowerMeter", "Torque"), None);
        assert_eq!(catalog.sensor_for("Gps", "Latitude"), None);
        assert_eq!(catalog.signal_for("altitude"), None);
    }

    #[test]
    fn test_empty_catalog_is_fatal() {
        assert!(matches!(
            SignalCatalog::from_json("{}"),
            Err(ConfigError::EmptyCatalog)
        ));

        let only_nulls = r#"{"signals": {"PowerMeter": {"Balance": {"sensor": null}}}}"#;
        assert!(matches!(
            SignalCatalog::from_json(only_nulls),
            Err(ConfigError::EmptyCatalog)
        ));
    }

    #[test]
    fn test_conflicting_tables_are_fatal() {
        let conflict = r#"{
            "sensors": { "power": { "message": "PowerMeter", "signal": "Power" } },
            "signals": { "PowerMeter": { "Power": { "sensor": "watts" } } }
        }"#;
        assert!(matches!(
            SignalCatalog::from_json(conflict),
            Err(ConfigError::CatalogConflict { .. })
        ));
    }

    #[test]
    fn test_malformed_json_is_fatal() {
        assert!(matches!(
            SignalCatalog::from_json("{\"sensors\": ["),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_fatal() {
        assert!(matches!(
            SignalCatalog::load("/nonexistent/catalog.json"),
            Err(ConfigError::IoError { .. })
        ));
    }

    #[test]
    fn test_unresolved_targets() {
        let catalog = SignalCatalog::from_json(CATALOG).unwrap();
        let db = SignalDatabase::new(vec![MessageDef {
            name: "PowerMeter".into(),
            frame_id: 0x120,
            extended: false,
            length: 2,
            signals: vec![SignalDef::new("Power", 0, SignalType::U16)],
        }])
        .unwrap();

        assert_eq!(
            catalog.unresolved(&db),
            vec![SignalRef::new("PowerMeter", "Cadence")]
        );
    }
}
