//! Process configuration from environment variables.
//!
//! Loaded once at startup into an immutable [`Config`] that is passed into
//! the collector loop; nothing reads the environment after that. A missing
//! required variable is the only fatal error class in the program.

use std::fmt::Display;
use std::str::FromStr;

/// Configuration errors. All fatal, all pre-loop.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("required variable not set: {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Immutable process-wide configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// InfluxDB server address (`INFLUXDB_HOSTNAME`).
    pub influxdb_hostname: String,
    /// InfluxDB TCP port (`INFLUXDB_PORT`, default 8086).
    pub influxdb_port: u16,
    /// Write token (`INFLUXDB_TOKEN`).
    pub influxdb_token: String,
    /// InfluxDB organization (`INFLUXDB_ORG`).
    pub influxdb_org: String,
    /// Destination bucket (`INFLUXDB_BUCKET`, default "solar").
    pub influxdb_bucket: String,
    /// Inverter network address (`INVERTER_HOSTNAME`).
    pub inverter_hostname: String,
    /// Inverter Modbus TCP port (`INVERTER_PORT`, default 502).
    pub inverter_port: u16,
    /// Poll interval in seconds (`SCAN_INTERVAL`, default 30).
    pub scan_interval_secs: u64,
    /// Stdout summary toggle (`ENABLE_LOGGING`, default false).
    pub enable_logging: bool,
    /// Sink write toggle, off for dry runs (`ENABLE_INFLUXDB`, default true).
    pub enable_influxdb: bool,
}

impl Config {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable source.
    ///
    /// Tests use this to exercise the loader without mutating the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let scan_interval_secs = parse_or("SCAN_INTERVAL", &lookup, 30)?;
        if scan_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "SCAN_INTERVAL",
                value: "0".to_string(),
                reason: "interval must be at least 1 second".to_string(),
            });
        }

        Ok(Self {
            influxdb_hostname: required("INFLUXDB_HOSTNAME")?,
            influxdb_port: parse_or("INFLUXDB_PORT", &lookup, 8086)?,
            influxdb_token: required("INFLUXDB_TOKEN")?,
            influxdb_org: required("INFLUXDB_ORG")?,
            influxdb_bucket: lookup("INFLUXDB_BUCKET").unwrap_or_else(|| "solar".to_string()),
            inverter_hostname: required("INVERTER_HOSTNAME")?,
            inverter_port: parse_or("INVERTER_PORT", &lookup, 502)?,
            scan_interval_secs,
            enable_logging: parse_bool_or("ENABLE_LOGGING", &lookup, false)?,
            enable_influxdb: parse_bool_or("ENABLE_INFLUXDB", &lookup, true)?,
        })
    }
}

fn parse_or<T>(
    name: &'static str,
    lookup: impl Fn(&str) -> Option<String>,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            value,
            reason: e.to_string(),
        }),
    }
}

fn parse_bool_or(
    name: &'static str,
    lookup: impl Fn(&str) -> Option<String>,
    default: bool,
) -> Result<bool, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(value) => match value.to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(ConfigError::Invalid {
                name,
                value,
                reason: "expected true or false".to_string(),
            }),
        },
    }
}
