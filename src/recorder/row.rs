//! # Log Row Layout
//!
//! Header and row flattening for the per-link CSV logs. Columns follow the
//! record schema in wire order, prefixed by the arrival timestamp.

use chrono::Utc;
use std::fmt::Write;

use crate::telemetry::record::{ReceivedPacket, TelemetryRecord};

/// Arrival timestamp format, rendered in UTC; lexically sortable, millisecond precision
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Log columns, in order
#[rustfmt::skip]
pub const LOG_COLUMNS: [&str; TelemetryRecord::FIELD_COUNT + 1] = [
    "timestamp",
    "boot_time",
    "temp",
    "voltage",
    "sv1", "sv2", "sv3", "sv4", "sv5", "sv6", "sv7", "sv8",
    "mv1", "mv2", "mv3", "mv4",
    "va1", "va2", "va3", "va4", "va5", "va6", "va7", "va8",
    "tc1", "tc2", "tc3", "tc4", "tc5", "tc6",
    "ir",
    "ip",
    "iy",
    "fault1", "fault2", "fault3", "fault4", "fault5",
];

/// The header row
pub fn header() -> String {
    LOG_COLUMNS.join(",")
}

/// Flattens a packet into one CSV row (no trailing newline)
pub fn flatten(packet: &ReceivedPacket) -> String {
    let r = &packet.record;
    let mut row = packet
        .arrival_time
        .with_timezone(&Utc)
        .format(TIMESTAMP_FORMAT)
        .to_string();

    // Writing into a String cannot fail
    let _ = write!(row, ",{},{},{}", r.boot_time, r.temperature, r.voltage);
    push_all(&mut row, &r.valve_states);
    push_all(&mut row, &r.valve_angles);
    push_all(&mut row, &r.analog_channels);
    push_all(&mut row, &r.thermocouples);
    let _ = write!(
        row,
        ",{},{},{}",
        r.attitude.roll, r.attitude.pitch, r.attitude.yaw
    );
    push_all(&mut row, &r.fault_flags);
    row
}

fn push_all<T: std::fmt::Display>(row: &mut String, values: &[T]) {
    for value in values {
        let _ = write!(row, ",{}", value);
    }
}
