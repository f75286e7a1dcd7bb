//! # Telemetry Record Types
//!
//! The fixed vehicle telemetry schema and the types that tag a record with
//! where and when it arrived.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

/// Number of solenoid valve states (sv1..sv8)
pub const VALVE_STATE_COUNT: usize = 8;

/// Number of motor valve angles (mv1..mv4)
pub const VALVE_ANGLE_COUNT: usize = 4;

/// Number of analog channels (va1..va8)
pub const ANALOG_CHANNEL_COUNT: usize = 8;

/// Number of thermocouple channels (tc1..tc6)
pub const THERMOCOUPLE_COUNT: usize = 6;

/// Number of fault flags (fault1..fault5)
pub const FAULT_FLAG_COUNT: usize = 5;

/// Telemetry link identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceId {
    /// Umbilical (wired) link
    #[serde(rename = "UMB")]
    Umb,
    /// Radio telemetry link
    #[serde(rename = "TLM")]
    Tlm,
}

impl SourceId {
    /// Both links, in display order
    pub const ALL: [SourceId; 2] = [SourceId::Umb, SourceId::Tlm];

    /// Upper-case tag used in file names, diagnostics and config
    pub fn as_str(self) -> &'static str {
        match self {
            SourceId::Umb => "UMB",
            SourceId::Tlm => "TLM",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UMB" => Ok(SourceId::Umb),
            "TLM" => Ok(SourceId::Tlm),
            other => Err(format!("unknown source '{}' (expected UMB or TLM)", other)),
        }
    }
}

/// One value per telemetry link, indexed by [`SourceId`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PerSource<T> {
    pub umb: T,
    pub tlm: T,
}

impl<T> PerSource<T> {
    /// Build both slots from a per-source constructor
    pub fn from_fn(mut f: impl FnMut(SourceId) -> T) -> Self {
        Self {
            umb: f(SourceId::Umb),
            tlm: f(SourceId::Tlm),
        }
    }

    /// Iterate `(source, value)` pairs in [`SourceId::ALL`] order
    pub fn iter(&self) -> impl Iterator<Item = (SourceId, &T)> {
        [(SourceId::Umb, &self.umb), (SourceId::Tlm, &self.tlm)].into_iter()
    }
}

impl<T> Index<SourceId> for PerSource<T> {
    type Output = T;

    fn index(&self, source: SourceId) -> &T {
        match source {
            SourceId::Umb => &self.umb,
            SourceId::Tlm => &self.tlm,
        }
    }
}

impl<T> IndexMut<SourceId> for PerSource<T> {
    fn index_mut(&mut self, source: SourceId) -> &mut T {
        match source {
            SourceId::Umb => &mut self.umb,
            SourceId::Tlm => &mut self.tlm,
        }
    }
}

/// Vehicle attitude in degrees
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Attitude {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

/// One fully decoded telemetry sample.
///
/// Every sequence has its fixed length; a record only exists when every field
/// of the line decoded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryRecord {
    /// Milliseconds since vehicle boot
    pub boot_time: i64,

    /// Board temperature in °C
    pub temperature: f64,

    /// Bus voltage in V
    pub voltage: f64,

    /// Solenoid valve states (1 = open)
    pub valve_states: [i32; VALVE_STATE_COUNT],

    /// Motor valve angles, 0-180°
    pub valve_angles: [f64; VALVE_ANGLE_COUNT],

    /// Raw ADC counts
    pub analog_channels: [f64; ANALOG_CHANNEL_COUNT],

    /// Raw thermocouple counts
    pub thermocouples: [f64; THERMOCOUPLE_COUNT],

    pub attitude: Attitude,

    pub fault_flags: [i32; FAULT_FLAG_COUNT],
}

impl TelemetryRecord {
    /// Number of scalar fields on the wire and in a log row (timestamp excluded)
    pub const FIELD_COUNT: usize = 3
        + VALVE_STATE_COUNT
        + VALVE_ANGLE_COUNT
        + ANALOG_CHANNEL_COUNT
        + THERMOCOUPLE_COUNT
        + 3
        + FAULT_FLAG_COUNT;
}

/// A decoded record tagged with its link and local arrival time
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedPacket {
    pub record: TelemetryRecord,
    pub arrival_time: DateTime<Local>,
    pub source: SourceId,
}

impl ReceivedPacket {
    /// Stamp a record as arriving now on `source`
    pub fn now(record: TelemetryRecord, source: SourceId) -> Self {
        Self {
            record,
            arrival_time: Local::now(),
            source,
        }
    }
}
