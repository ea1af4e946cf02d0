//! solar2influx daemon entry point.
//!
//! Loads configuration from the environment, wires the production
//! capabilities together and runs the collector loop until a shutdown
//! signal arrives. The only non-zero exit path is a startup failure;
//! runtime errors are logged and the loop carries on.

use anyhow::Context;
use clap::Parser;
use solar2influx::collector::Collector;
use solar2influx::config::Config;
use solar2influx::influx::InfluxSink;
use solar2influx::inverter::GoodweInverter;
use solar2influx::probe::TcpProber;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Polls a GoodWe solar inverter and writes its runtime telemetry to InfluxDB.
#[derive(Parser, Debug)]
#[command(name = "solar2influx")]
#[command(about = "Polls a GoodWe solar inverter and forwards telemetry to InfluxDB")]
#[command(version)]
struct Args {
    /// Log level when RUST_LOG is not set (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Diagnostics go to stderr; stdout is reserved for the verbose echo.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env().context("configuration error")?;

    let prober = TcpProber;
    let source = GoodweInverter::new(config.inverter_hostname.clone(), config.inverter_port);
    let sink = InfluxSink::new(
        &config.influxdb_hostname,
        config.influxdb_port,
        &config.influxdb_org,
        &config.influxdb_bucket,
        &config.influxdb_token,
    )
    .context("failed to build InfluxDB client")?;

    info!(
        device = %config.inverter_hostname,
        sink = %config.influxdb_hostname,
        bucket = %config.influxdb_bucket,
        interval_secs = config.scan_interval_secs,
        "starting solar2influx"
    );

    let collector = Collector::new(config, prober, source, sink);

    tokio::select! {
        _ = collector.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("received shutdown signal");
        }
    }

    Ok(())
}
