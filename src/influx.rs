//! InfluxDB v2 sink client and line-protocol rendering.
//!
//! One batched write per cycle against `/api/v2/write`. There is no retry
//! and no local buffering: a rejected batch is dropped and the next cycle
//! produces a fresh one.

use crate::telemetry::MetricPoint;
use std::time::Duration;
use tracing::debug;

/// Bound on one write request, connect included.
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(10);

/// Sink-side failure for one batched write.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("write request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("write rejected: {status}: {message}")]
    Rejected {
        status: reqwest::StatusCode,
        message: String,
    },
}

/// A capability that persists one batch of metric points.
#[allow(async_fn_in_trait)]
pub trait MetricSink {
    async fn write_batch(&self, points: &[MetricPoint]) -> Result<(), SinkError>;
}

/// Production sink speaking the InfluxDB v2 HTTP write API.
pub struct InfluxSink {
    client: reqwest::Client,
    write_url: String,
    org: String,
    bucket: String,
    token: String,
}

impl InfluxSink {
    pub fn new(
        host: &str,
        port: u16,
        org: impl Into<String>,
        bucket: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder().timeout(WRITE_TIMEOUT).build()?;

        Ok(Self {
            client,
            write_url: format!("http://{}:{}/api/v2/write", host, port),
            org: org.into(),
            bucket: bucket.into(),
            token: token.into(),
        })
    }
}

impl MetricSink for InfluxSink {
    async fn write_batch(&self, points: &[MetricPoint]) -> Result<(), SinkError> {
        let body = render_lines(points);
        if body.is_empty() {
            debug!("no available points in batch, skipping write");
            return Ok(());
        }

        let response = self
            .client
            .post(&self.write_url)
            .query(&[
                ("org", self.org.as_str()),
                ("bucket", self.bucket.as_str()),
                ("precision", "ms"),
            ])
            .header("Authorization", format!("Token {}", self.token))
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!(bucket = %self.bucket, "batch written");
            return Ok(());
        }

        // InfluxDB reports rejections as a JSON body with a "message" key.
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_owned))
            .unwrap_or(body);

        Err(SinkError::Rejected { status, message })
    }
}

/// Render a batch as InfluxDB line protocol, one line per available point.
///
/// Unavailable points (`value: None`) are omitted entirely; they must never
/// reach the sink as zero. Timestamps are millisecond precision, matching
/// the `precision=ms` write parameter.
pub fn render_lines(points: &[MetricPoint]) -> String {
    let mut out = String::new();
    for point in points {
        let Some(value) = point.value else {
            continue;
        };

        out.push_str(&escape_name(point.measurement));
        out.push(' ');
        out.push_str(&escape_name(point.unit));
        out.push('=');
        // No `i` suffix: every value is an InfluxDB float.
        out.push_str(&value.to_string());
        out.push(' ');
        out.push_str(&point.timestamp.to_string());
        out.push('\n');
    }
    out
}

/// Escape a measurement or field key per the line-protocol rules.
fn escape_name(name: &str) -> String {
    name.replace(',', "\\,")
        .replace(' ', "\\ ")
        .replace('=', "\\=")
}
