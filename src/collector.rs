//! The collector loop: probe, acquire, map, forward, wait, repeat.
//!
//! Each stage's failure is caught at its own boundary and logged; nothing
//! short of losing the tokio runtime stops the loop. The next scheduled
//! cycle is the only retry mechanism.

use crate::catalog;
use crate::config::Config;
use crate::influx::MetricSink;
use crate::inverter::TelemetrySource;
use crate::probe::Prober;
use crate::telemetry::{FieldValue, Snapshot};
use chrono::{Local, TimeZone};
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Result of one poll cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// The reachability probe failed; nothing else was attempted.
    Unreachable,
    /// The device answered the probe but the data read failed.
    AcquisitionFailed,
    /// A complete snapshot was read and handed to the forwarder.
    AcquisitionSucceeded(Snapshot),
}

/// Snapshot fields echoed to stdout when `ENABLE_LOGGING` is on.
const ECHO_FIELDS: &[(&str, &str)] = &[
    ("PV1 Voltage (V) (vpv1)", "vpv1"),
    ("PV1 Current (A) (ipv1)", "ipv1"),
    ("PV1 Power (W) (ppv1)", "ppv1"),
    ("PV2 Voltage (V) (vpv2)", "vpv2"),
    ("PV2 Current (A) (ipv2)", "ipv2"),
    ("PV2 Power (W) (ppv2)", "ppv2"),
    ("On-grid L1-L2 Voltage (V) (vline1)", "vline1"),
    ("Grid Voltage (V) (vgrid1)", "vgrid1"),
    ("Grid Current (A) (igrid1)", "igrid1"),
    ("Grid Frequency (Hz) (fgrid1)", "fgrid1"),
    ("Grid Power (W) (pgrid1)", "pgrid1"),
    ("PV Power (W) (ppv)", "ppv"),
    ("Temperature (degrees celcius) (temperature)", "temperature"),
    ("Total hours (hours) (h_total)", "h_total"),
    ("Total load (kWH) (e_total)", "e_total"),
    ("Today's load (kWH) (e_day)", "e_day"),
];

/// The top-level scheduler driving one device against one sink.
pub struct Collector<P, S, K> {
    config: Config,
    prober: P,
    source: S,
    sink: K,
}

impl<P, S, K> Collector<P, S, K>
where
    P: Prober,
    S: TelemetrySource,
    K: MetricSink,
{
    pub fn new(config: Config, prober: P, source: S, sink: K) -> Self {
        Self {
            config,
            prober,
            source,
            sink,
        }
    }

    /// Run cycles forever at the configured interval.
    ///
    /// Fixed-rate scheduling: the gap between cycle starts is the interval,
    /// independent of how long a cycle takes. A cycle that overruns the
    /// interval delays the next tick rather than bursting to catch up.
    pub async fn run(&self) {
        let mut ticker = interval(Duration::from_secs(self.config.scan_interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            device = %self.config.inverter_hostname,
            interval_secs = self.config.scan_interval_secs,
            "starting collector loop"
        );

        loop {
            ticker.tick().await;
            self.run_cycle().await;
        }
    }

    /// One probe, acquire, map, forward pass.
    ///
    /// Stage failures end the cycle with the matching outcome; they never
    /// propagate.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let host = &self.config.inverter_hostname;

        if !self.prober.probe(host, self.config.inverter_port).await {
            warn!(device = %host, "inverter unreachable, skipping cycle");
            return CycleOutcome::Unreachable;
        }

        let snapshot = match self.source.acquire().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(device = %host, error = %e, "failed to read runtime data");
                return CycleOutcome::AcquisitionFailed;
            }
        };

        debug!(device = %host, fields = snapshot.len(), "acquired snapshot");
        self.forward(&snapshot).await;

        CycleOutcome::AcquisitionSucceeded(snapshot)
    }

    /// Map the snapshot and hand the batch to the sink, then echo.
    ///
    /// A sink failure drops the batch; the echo runs regardless of the sink
    /// outcome and never affects control flow.
    async fn forward(&self, snapshot: &Snapshot) {
        let points = catalog::map_snapshot(snapshot);

        let mut written = false;
        if self.config.enable_influxdb {
            match self.sink.write_batch(&points).await {
                Ok(()) => {
                    written = true;
                    debug!(points = points.len(), "batch forwarded to sink");
                }
                Err(e) => {
                    error!(
                        sink = %self.config.influxdb_hostname,
                        error = %e,
                        "failed to write to InfluxDB"
                    );
                }
            }
        }

        if self.config.enable_logging {
            echo_snapshot(snapshot, written, &self.config.influxdb_hostname);
        }
    }
}

/// Human-readable stdout summary of a snapshot's headline fields.
fn echo_snapshot(snapshot: &Snapshot, written: bool, sink_host: &str) {
    let timestamp = Local
        .timestamp_millis_opt(snapshot.timestamp)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| snapshot.timestamp.to_string());

    println!("Date + time: {}", timestamp);
    for (label, field) in ECHO_FIELDS {
        println!("{}: {}", label, display_field(snapshot.get(field)));
    }
    if written {
        println!("==> Data written to InfluxDB host {}", sink_host);
    }
}

fn display_field(value: Option<&FieldValue>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "n/a".to_string(),
    }
}
