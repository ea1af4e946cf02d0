//! Telemetry acquisition from GoodWe inverters over Modbus TCP.
//!
//! One acquisition is one session: connect, read the runtime register
//! blocks, decode, disconnect. The whole operation is bounded by a single
//! overall timeout so the collector loop can never stall on a wedged
//! device.

use crate::telemetry::Snapshot;
use std::time::Duration;
use tokio::net::lookup_host;
use tokio_modbus::client::Reader;
use tokio_modbus::prelude::*;
use tracing::debug;

/// Overall bound on one session-open-and-read operation.
pub const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Modbus unit id GoodWe inverters answer on.
const GOODWE_UNIT_ID: u8 = 247;

/// Classified acquisition failure.
#[derive(Debug, thiserror::Error)]
pub enum AcquireError {
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("acquisition timed out after {0:?}")]
    Timeout(Duration),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("malformed response: {0}")]
    Decode(String),
}

/// A capability that reads one complete runtime snapshot from a device.
///
/// Implementations return either a full [`Snapshot`] or a classified
/// failure; there is no partial success.
#[allow(async_fn_in_trait)]
pub trait TelemetrySource {
    async fn acquire(&self) -> Result<Snapshot, AcquireError>;
}

#[derive(Debug, Clone, Copy)]
enum RegKind {
    U16,
    I16,
    U32,
    I32,
}

impl RegKind {
    fn width(self) -> u16 {
        match self {
            RegKind::U16 | RegKind::I16 => 1,
            RegKind::U32 | RegKind::I32 => 2,
        }
    }
}

/// One runtime-data register and the snapshot field it decodes into.
struct RegisterDef {
    /// Word offset from the block start.
    offset: u16,
    field: &'static str,
    kind: RegKind,
    /// Decimal divisor applied to the raw value (1 = integer pass-through).
    divisor: u16,
}

const fn reg(offset: u16, field: &'static str, kind: RegKind, divisor: u16) -> RegisterDef {
    RegisterDef {
        offset,
        field,
        kind,
        divisor,
    }
}

/// A contiguous register range read in one Modbus request.
struct RegisterBlock {
    start: u16,
    count: u16,
    registers: &'static [RegisterDef],
}

/// ET-family runtime data: PV strings and grid phase 1.
const RUNNING_BLOCK: RegisterBlock = RegisterBlock {
    start: 35100,
    count: 40,
    registers: &[
        reg(3, "vpv1", RegKind::U16, 10),
        reg(4, "ipv1", RegKind::U16, 10),
        reg(5, "ppv1", RegKind::U32, 1),
        reg(7, "vpv2", RegKind::U16, 10),
        reg(8, "ipv2", RegKind::U16, 10),
        reg(9, "ppv2", RegKind::U32, 1),
        reg(17, "vline1", RegKind::U16, 10),
        reg(21, "vgrid1", RegKind::U16, 10),
        reg(22, "igrid1", RegKind::U16, 10),
        reg(23, "fgrid1", RegKind::U16, 100),
        reg(25, "pgrid1", RegKind::I16, 1),
        reg(33, "ppv", RegKind::U32, 1),
    ],
};

/// ET-family counters: temperatures, energy totals, load.
const ENERGY_BLOCK: RegisterBlock = RegisterBlock {
    start: 35170,
    count: 45,
    registers: &[
        reg(3, "temperature", RegKind::I16, 10),
        reg(21, "e_total", RegKind::U32, 10),
        reg(23, "e_day", RegKind::U32, 10),
        reg(25, "h_total", RegKind::U32, 1),
        reg(27, "e_load_total", RegKind::U32, 10),
        reg(29, "e_load_day", RegKind::U16, 10),
        reg(30, "load_ptotal", RegKind::U16, 1),
        reg(31, "house_consumption", RegKind::U16, 1),
        reg(33, "e_bat_charge_total", RegKind::U32, 10),
        reg(35, "e_bat_charge_day", RegKind::U16, 10),
        reg(36, "e_bat_discharge_total", RegKind::U32, 10),
        reg(38, "e_bat_discharge_day", RegKind::U16, 10),
    ],
};

/// BMS data block.
const BATTERY_BLOCK: RegisterBlock = RegisterBlock {
    start: 37000,
    count: 16,
    registers: &[
        reg(3, "battery_temperature", RegKind::I16, 10),
        reg(4, "battery_charge_limit", RegKind::U16, 1),
        reg(5, "battery_discharge_limit", RegKind::U16, 1),
        reg(6, "battery_error_l", RegKind::U16, 1),
        reg(7, "battery_soc", RegKind::U16, 1),
        reg(8, "battery_soh", RegKind::U16, 1),
        reg(9, "battery_warning_l", RegKind::U16, 1),
        reg(10, "battery_status", RegKind::U16, 1),
        reg(11, "battery_index", RegKind::U16, 1),
        reg(12, "battery_error_h", RegKind::U16, 1),
        reg(13, "battery_warning_h", RegKind::U16, 1),
    ],
};

const BLOCKS: &[&RegisterBlock] = &[&RUNNING_BLOCK, &ENERGY_BLOCK, &BATTERY_BLOCK];

/// Production telemetry source speaking Modbus TCP to a GoodWe inverter.
pub struct GoodweInverter {
    host: String,
    port: u16,
    timeout: Duration,
}

impl GoodweInverter {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            timeout: ACQUIRE_TIMEOUT,
        }
    }

    async fn read_runtime_data(&self) -> Result<Snapshot, AcquireError> {
        let addr = lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(|e| AcquireError::Connect(e.to_string()))?
            .next()
            .ok_or_else(|| {
                AcquireError::Connect(format!("{} resolved to no addresses", self.host))
            })?;

        let mut ctx = tcp::connect_slave(addr, Slave(GOODWE_UNIT_ID))
            .await
            .map_err(|e| AcquireError::Connect(e.to_string()))?;

        let mut snapshot = Snapshot::new();
        for block in BLOCKS {
            let words = ctx
                .read_holding_registers(block.start, block.count)
                .await
                .map_err(|e| AcquireError::Protocol(e.to_string()))?
                .map_err(|e| AcquireError::Protocol(format!("exception: {e:?}")))?;
            decode_block(block, &words, &mut snapshot)?;
        }

        debug!(device = %self.host, fields = snapshot.len(), "decoded runtime data");
        Ok(snapshot)
    }
}

impl TelemetrySource for GoodweInverter {
    async fn acquire(&self) -> Result<Snapshot, AcquireError> {
        tokio::time::timeout(self.timeout, self.read_runtime_data())
            .await
            .map_err(|_| AcquireError::Timeout(self.timeout))?
    }
}

/// Decode one block's raw words into snapshot fields.
fn decode_block(
    block: &RegisterBlock,
    words: &[u16],
    snapshot: &mut Snapshot,
) -> Result<(), AcquireError> {
    if words.len() < block.count as usize {
        return Err(AcquireError::Decode(format!(
            "short read at {}: got {} of {} registers",
            block.start,
            words.len(),
            block.count
        )));
    }

    for def in block.registers {
        let i = def.offset as usize;
        let raw: i64 = match def.kind {
            RegKind::U16 => words[i] as i64,
            RegKind::I16 => words[i] as i16 as i64,
            RegKind::U32 => (((words[i] as u32) << 16) | (words[i + 1] as u32)) as i64,
            RegKind::I32 => (((words[i] as u32) << 16) | (words[i + 1] as u32)) as i32 as i64,
        };

        if def.divisor == 1 {
            snapshot.insert(def.field, raw);
        } else {
            snapshot.insert(def.field, raw as f64 / def.divisor as f64);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CATALOG;
    use crate::telemetry::FieldValue;

    #[test]
    fn test_register_tables_fit_their_blocks() {
        for block in BLOCKS {
            for def in block.registers {
                assert!(
                    def.offset + def.kind.width() <= block.count,
                    "register {} at offset {} overruns block {}",
                    def.field,
                    def.offset,
                    block.start
                );
            }
        }
    }

    #[test]
    fn test_every_register_field_is_cataloged() {
        for block in BLOCKS {
            for def in block.registers {
                assert!(
                    CATALOG.iter().any(|e| e.field == def.field),
                    "register field {} has no catalog entry",
                    def.field
                );
            }
        }
    }

    #[test]
    fn test_decode_scaled_u16() {
        let mut words = vec![0u16; RUNNING_BLOCK.count as usize];
        words[3] = 1886; // vpv1, 0.1 V steps
        words[23] = 4999; // fgrid1, 0.01 Hz steps

        let mut snapshot = Snapshot::with_timestamp(0);
        decode_block(&RUNNING_BLOCK, &words, &mut snapshot).unwrap();

        assert_eq!(snapshot.get("vpv1"), Some(&FieldValue::Float(188.6)));
        assert_eq!(snapshot.get("fgrid1"), Some(&FieldValue::Float(49.99)));
    }

    #[test]
    fn test_decode_signed_and_wide() {
        let mut words = vec![0u16; RUNNING_BLOCK.count as usize];
        words[25] = (-28i16) as u16; // pgrid1 can go negative when exporting
        words[33] = 0x0001; // ppv high word
        words[34] = 0x0002; // ppv low word -> 65538

        let mut snapshot = Snapshot::with_timestamp(0);
        decode_block(&RUNNING_BLOCK, &words, &mut snapshot).unwrap();

        assert_eq!(snapshot.get("pgrid1"), Some(&FieldValue::Integer(-28)));
        assert_eq!(snapshot.get("ppv"), Some(&FieldValue::Integer(65538)));
    }

    #[test]
    fn test_short_read_is_a_decode_error() {
        let words = vec![0u16; 4];
        let mut snapshot = Snapshot::with_timestamp(0);

        let err = decode_block(&RUNNING_BLOCK, &words, &mut snapshot).unwrap_err();
        assert!(matches!(err, AcquireError::Decode(_)));
    }
}
