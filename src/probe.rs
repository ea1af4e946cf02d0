//! Device reachability probing.
//!
//! A full acquisition pays for a protocol handshake and several block reads
//! before its timeout fires, so each cycle starts with a cheap TCP connect
//! probe of the telemetry port. A device that is off or unplugged is
//! detected here and the cycle ends without an acquisition attempt.

use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

/// Connection attempts before a device is declared unreachable.
pub const PROBE_ATTEMPTS: u32 = 3;

/// Per-attempt connect timeout.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// A liveness check run before the full acquisition.
///
/// Implementations never fail: an inconclusive probe is reported as
/// unreachable.
#[allow(async_fn_in_trait)]
pub trait Prober {
    /// Probe the device at `host:port`, returning a reachability verdict.
    async fn probe(&self, host: &str, port: u16) -> bool;
}

/// Production prober: bounded TCP connection attempts against the device's
/// telemetry port.
pub struct TcpProber;

impl Prober for TcpProber {
    async fn probe(&self, host: &str, port: u16) -> bool {
        for attempt in 1..=PROBE_ATTEMPTS {
            match tokio::time::timeout(PROBE_TIMEOUT, TcpStream::connect((host, port))).await {
                Ok(Ok(_)) => return true,
                Ok(Err(e)) => {
                    debug!(device = %host, attempt, error = %e, "probe attempt failed");
                }
                Err(_) => {
                    debug!(device = %host, attempt, "probe attempt timed out");
                }
            }
        }
        false
    }
}
