//! The metric catalog: the fixed table defining which snapshot fields
//! become which named measurements at the sink.
//!
//! Supporting a new measurement means adding one `CatalogEntry` here;
//! nothing else in the crate changes.

use crate::telemetry::{FieldValue, MetricPoint, Snapshot};

/// One row of the catalog: source field, sink measurement name, unit tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Field name in the snapshot, looked up by exact match.
    pub field: &'static str,
    /// Measurement name at the sink.
    pub measurement: &'static str,
    /// Unit tag, used as the sink field key.
    pub unit: &'static str,
}

const fn entry(
    field: &'static str,
    measurement: &'static str,
    unit: &'static str,
) -> CatalogEntry {
    CatalogEntry {
        field,
        measurement,
        unit,
    }
}

/// The full, ordered catalog. Fixed at build time.
pub const CATALOG: &[CatalogEntry] = &[
    entry("vpv1", "vpv1", "volt"),
    entry("ipv1", "ipv1", "ampere"),
    entry("ppv1", "ppv1", "watt"),
    entry("vpv2", "vpv2", "volt"),
    entry("ipv2", "ipv2", "ampere"),
    entry("ppv2", "ppv2", "watt"),
    entry("vline1", "vline1", "volt"),
    entry("vgrid1", "vgrid1", "volt"),
    entry("igrid1", "igrid1", "ampere"),
    entry("fgrid1", "fgrid1", "hz"),
    entry("pgrid1", "pgrid1", "watt"),
    entry("ppv", "ppv", "watt"),
    entry("h_total", "h_total", "hours"),
    entry("e_total", "e_total", "kwh"),
    entry("e_day", "e_day", "kwh"),
    entry("temperature", "temperature", "degrees"),
    entry("battery_soc", "battery_soc", "percent"),
    entry("battery_soh", "battery_soh", "percent"),
    entry("battery_index", "battery_index", "watt"),
    entry("battery_temperature", "battery_temperature", "degrees"),
    entry("battery_charge_limit", "battery_charge_limit", "ampere"),
    entry("battery_discharge_limit", "battery_discharge_limit", "ampere"),
    entry("battery_error_l", "battery_error_l", "error"),
    entry("battery_error_h", "battery_error_h", "error"),
    entry("battery_warning_l", "battery_warning_l", "warning"),
    entry("battery_warning_h", "battery_warning_h", "warning"),
    entry("load_ptotal", "load_ptotal", "watt"),
    entry("house_consumption", "house_consumption", "watt"),
    entry("e_bat_charge_day", "e_bat_charge_day", "kwh"),
    entry("e_bat_discharge_day", "e_bat_discharge_day", "kwh"),
    entry("e_load_day", "e_load_day", "kwh"),
    entry("e_load_total", "e_load_total", "kwh"),
    entry("e_bat_charge_total", "e_bat_charge_total", "kwh"),
    entry("e_bat_discharge_total", "e_bat_discharge_total", "kwh"),
    entry("battery_status", "battery_status", "status"),
];

/// Map a snapshot to metric points, one per catalog entry in catalog order.
///
/// Total for any snapshot shape: a field that is missing or non-numeric
/// yields a point with `value: None` instead of being skipped, so the
/// output length always equals the catalog length and downstream dashboards
/// see a consistent set of measurements.
pub fn map_snapshot(snapshot: &Snapshot) -> Vec<MetricPoint> {
    CATALOG
        .iter()
        .map(|entry| MetricPoint {
            measurement: entry.measurement,
            unit: entry.unit,
            value: snapshot.get(entry.field).and_then(FieldValue::as_f64),
            timestamp: snapshot.timestamp,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot() -> Snapshot {
        let mut snapshot = Snapshot::with_timestamp(1_724_617_704_000);
        snapshot.insert("ppv", 18i64);
        snapshot.insert("e_day", 14.5);
        snapshot.insert("vpv1", 188.6);
        snapshot
    }

    #[test]
    fn test_output_length_equals_catalog_length() {
        let points = map_snapshot(&sample_snapshot());
        assert_eq!(points.len(), CATALOG.len());

        // Even a completely empty snapshot keeps the output shape.
        let points = map_snapshot(&Snapshot::with_timestamp(0));
        assert_eq!(points.len(), CATALOG.len());
        assert!(points.iter().all(|p| p.value.is_none()));
    }

    #[test]
    fn test_present_fields_pass_through() {
        let points = map_snapshot(&sample_snapshot());

        let ppv = points.iter().find(|p| p.measurement == "ppv").unwrap();
        assert_eq!(ppv.value, Some(18.0));
        assert_eq!(ppv.unit, "watt");
        assert_eq!(ppv.timestamp, 1_724_617_704_000);

        let e_day = points.iter().find(|p| p.measurement == "e_day").unwrap();
        assert_eq!(e_day.value, Some(14.5));
        assert_eq!(e_day.unit, "kwh");
    }

    #[test]
    fn test_missing_fields_marked_unavailable() {
        let points = map_snapshot(&sample_snapshot());

        let soc = points
            .iter()
            .find(|p| p.measurement == "battery_soc")
            .unwrap();
        assert_eq!(soc.value, None);
    }

    #[test]
    fn test_non_numeric_fields_coalesce_to_unavailable() {
        let mut snapshot = Snapshot::with_timestamp(0);
        snapshot.insert("battery_soc", "not a number");

        let points = map_snapshot(&snapshot);
        let soc = points
            .iter()
            .find(|p| p.measurement == "battery_soc")
            .unwrap();
        assert_eq!(soc.value, None);
    }

    #[test]
    fn test_mapping_is_idempotent() {
        let snapshot = sample_snapshot();
        assert_eq!(map_snapshot(&snapshot), map_snapshot(&snapshot));
    }

    #[test]
    fn test_catalog_measurements_unique() {
        let mut seen = std::collections::HashSet::new();
        for entry in CATALOG {
            assert!(
                seen.insert(entry.measurement),
                "duplicate measurement: {}",
                entry.measurement
            );
        }
    }
}
