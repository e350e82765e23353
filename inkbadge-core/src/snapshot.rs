//! Sensor snapshot
//!
//! A mapping from sensor key to display string for one render tick. Failed
//! reads are stored inline as [`SENSOR_ERROR`] rather than surfaced as
//! errors, so the renderer never has to handle a fetch failure.

use std::collections::BTreeMap;

/// Value stored for a sensor whose read failed
pub const SENSOR_ERROR: &str = "ERR";

/// Value shown for a key missing from the snapshot
pub const MISSING_VALUE: &str = "---";

/// Sensor readings for one tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorSnapshot {
    values: BTreeMap<String, String>,
}

impl SensorSnapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value for `key`
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Mark `key` as failed
    pub fn insert_error(&mut self, key: impl Into<String>) {
        self.insert(key, SENSOR_ERROR);
    }

    /// Value for `key`, if present
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Value for `key`, or the missing-value placeholder
    pub fn value_or_missing(&self, key: &str) -> &str {
        self.get(key).unwrap_or(MISSING_VALUE)
    }

    /// Iterate over (key, value) pairs in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for SensorSnapshot
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for (key, value) in iter {
            snapshot.insert(key, value);
        }
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_placeholder() {
        let snapshot: SensorSnapshot = [("co2", "812")].into_iter().collect();
        assert_eq!(snapshot.value_or_missing("co2"), "812");
        assert_eq!(snapshot.value_or_missing("pm25"), MISSING_VALUE);
    }

    #[test]
    fn test_insert_error() {
        let mut snapshot = SensorSnapshot::new();
        snapshot.insert_error("co");
        assert_eq!(snapshot.get("co"), Some(SENSOR_ERROR));
        assert_eq!(snapshot.len(), 1);
    }
}
