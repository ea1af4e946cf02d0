//! solar2influx
//!
//! A resilient telemetry collector for GoodWe solar inverters. Every scan
//! interval it probes the inverter, reads one runtime snapshot over Modbus
//! TCP, maps the snapshot onto a fixed metric catalog, and forwards the
//! batch to InfluxDB. Transient device and network failures are logged and
//! absorbed; the process is meant to run forever, unattended.
//!
//! - [`probe`] - Reachability probing before the full read
//! - [`inverter`] - `TelemetrySource` capability and the GoodWe Modbus client
//! - [`telemetry`] - Snapshot and metric point data model
//! - [`catalog`] - The fixed field-to-measurement mapping table
//! - [`influx`] - `MetricSink` capability and the InfluxDB v2 client
//! - [`collector`] - The top-level polling loop
//! - [`config`] - Environment-based process configuration

pub mod catalog;
pub mod collector;
pub mod config;
pub mod influx;
pub mod inverter;
pub mod probe;
pub mod telemetry;

// Re-export commonly used types at the crate root
pub use catalog::{CatalogEntry, CATALOG, map_snapshot};
pub use collector::{Collector, CycleOutcome};
pub use config::{Config, ConfigError};
pub use influx::{InfluxSink, MetricSink, SinkError};
pub use inverter::{AcquireError, GoodweInverter, TelemetrySource};
pub use probe::{Prober, TcpProber};
pub use telemetry::{current_timestamp_millis, FieldValue, MetricPoint, Snapshot};
