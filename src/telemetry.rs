//! Core telemetry data model: snapshots read from the inverter and the
//! metric points derived from them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// A raw scalar value as reported by the device.
///
/// Inverter firmware varies in how it types its fields, so the model keeps
/// the raw shape and leaves interpretation to the consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Whole-number reading (counters, status words, watts).
    Integer(i64),
    /// Fractional reading (volts, amps, kWh).
    Float(f64),
    /// Free-text reading (mode labels, error strings).
    Text(String),
}

impl FieldValue {
    /// Numeric view of the value; `None` for text fields.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(v) => Some(*v as f64),
            FieldValue::Float(v) => Some(*v),
            FieldValue::Text(_) => None,
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Integer(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Text(v) => write!(f, "{}", v),
        }
    }
}

/// One point-in-time set of measurements read from the inverter.
///
/// Not guaranteed to contain every known field: device model and firmware
/// variance means fields may be absent, and [`Snapshot::get`] returns `None`
/// rather than a placeholder value. A snapshot is either complete or the
/// acquisition that produced it failed; it is never partially mutated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Unix epoch milliseconds when the snapshot was taken.
    pub timestamp: i64,
    fields: BTreeMap<String, FieldValue>,
}

impl Snapshot {
    /// Create an empty snapshot stamped with the current time.
    pub fn new() -> Self {
        Self::with_timestamp(current_timestamp_millis())
    }

    /// Create an empty snapshot with an explicit timestamp.
    pub fn with_timestamp(timestamp: i64) -> Self {
        Self {
            timestamp,
            fields: BTreeMap::new(),
        }
    }

    /// Record a field reading.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Look up a field by exact name.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Number of fields present.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the snapshot holds no fields at all.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A named, timestamped measurement ready for the sink.
///
/// `value` of `None` means the source field was unavailable in the snapshot.
/// Unavailable points are never forwarded as zero; the sink serializer omits
/// them from the write body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricPoint {
    /// Measurement name at the sink (e.g. `ppv`).
    pub measurement: &'static str,
    /// Unit tag used as the sink field key (e.g. `watt`).
    pub unit: &'static str,
    /// Numeric value, or `None` when the source field was absent.
    pub value: Option<f64>,
    /// Unix epoch milliseconds of the snapshot this point came from.
    pub timestamp: i64,
}

/// Get the current timestamp in milliseconds since Unix epoch.
///
/// Returns 0 if system time is before Unix epoch (should never happen in
/// practice).
pub fn current_timestamp_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_value_as_f64() {
        assert_eq!(FieldValue::Integer(18).as_f64(), Some(18.0));
        assert_eq!(FieldValue::Float(14.5).as_f64(), Some(14.5));
        assert_eq!(FieldValue::from("Discharge").as_f64(), None);
    }

    #[test]
    fn test_snapshot_lookup() {
        let mut snapshot = Snapshot::with_timestamp(1_724_617_704_000);
        snapshot.insert("ppv", 18i64);
        snapshot.insert("e_day", 14.5);

        assert_eq!(snapshot.get("ppv"), Some(&FieldValue::Integer(18)));
        assert_eq!(snapshot.get("e_day"), Some(&FieldValue::Float(14.5)));
        assert_eq!(snapshot.get("no_such_field"), None);
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn test_field_value_untagged_serde() {
        let mut snapshot = Snapshot::with_timestamp(0);
        snapshot.insert("battery_soc", 73i64);
        snapshot.insert("vpv1", 188.6);
        snapshot.insert("battery_mode_label", "Discharge");

        let json = serde_json::to_string(&snapshot).unwrap();
        let back: Snapshot = serde_json::from_str(&json).unwrap();

        assert_eq!(back, snapshot);
    }
}
