//! End-to-end mapping and rendering: snapshot in, line-protocol body out.

use solar2influx::catalog::{map_snapshot, CATALOG};
use solar2influx::influx::render_lines;
use solar2influx::telemetry::Snapshot;

fn runtime_snapshot() -> Snapshot {
    let mut snapshot = Snapshot::with_timestamp(1_724_617_704_000);
    snapshot.insert("vpv1", 188.6);
    snapshot.insert("ipv1", 0.1);
    snapshot.insert("ppv1", 18i64);
    snapshot.insert("ppv", 18i64);
    snapshot.insert("vgrid1", 233.0);
    snapshot.insert("fgrid1", 49.99);
    snapshot.insert("pgrid1", 148i64);
    snapshot.insert("temperature", 35.0);
    snapshot.insert("e_total", 5141.6);
    snapshot.insert("e_day", 14.5);
    snapshot.insert("h_total", 10014i64);
    snapshot.insert("battery_soc", 73i64);
    snapshot
}

#[test]
fn mapped_batch_renders_only_available_points() {
    let snapshot = runtime_snapshot();
    let points = map_snapshot(&snapshot);

    // The batch shape is the catalog, regardless of what the device sent.
    assert_eq!(points.len(), CATALOG.len());

    let body = render_lines(&points);

    // Present fields appear with their declared unit and the snapshot
    // timestamp.
    assert!(body.contains("ppv watt=18 1724617704000\n"));
    assert!(body.contains("e_day kwh=14.5 1724617704000\n"));
    assert!(body.contains("fgrid1 hz=49.99 1724617704000\n"));
    assert!(body.contains("battery_soc percent=73 1724617704000\n"));

    // Absent fields are omitted from the body, never rendered as zero.
    assert!(!body.contains("battery_soh"));
    assert!(!body.contains("vline1"));
    assert_eq!(body.lines().count(), snapshot.len());
}

#[test]
fn empty_snapshot_maps_to_full_batch_and_empty_body() {
    let points = map_snapshot(&Snapshot::with_timestamp(0));

    assert_eq!(points.len(), CATALOG.len());
    assert!(points.iter().all(|p| p.value.is_none()));
    assert!(render_lines(&points).is_empty());
}

#[test]
fn mapping_twice_renders_identically() {
    let snapshot = runtime_snapshot();

    let first = render_lines(&map_snapshot(&snapshot));
    let second = render_lines(&map_snapshot(&snapshot));

    assert_eq!(first, second);
}
