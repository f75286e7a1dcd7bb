//! Vehicle status panel rendering

use serde_json::json;

use super::calibration::Calibration;
use crate::telemetry::record::{ReceivedPacket, TelemetryRecord};

/// Local arrival time shown on the status panel
pub const DISPLAY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Renders a packet as the JSON document shown in the vehicle status panel
pub fn render_status(packet: &ReceivedPacket) -> String {
    let r = &packet.record;
    let doc = json!({
        "timestamp": packet.arrival_time.format(DISPLAY_TIMESTAMP_FORMAT).to_string(),
        "source": packet.source,
        "boot_time_ms": r.boot_time,
        "temp_c": r.temperature,
        "voltage_v": r.voltage,
        "sv": r.valve_states,
        "mv": r.valve_angles,
        "va": r.analog_channels,
        "tc": r.thermocouples,
        "attitude_deg": r.attitude,
        "fault": r.fault_flags,
    });
    serde_json::to_string_pretty(&doc).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
}

/// Calibrated channel and valve indicator summary for one record
///
/// Valves render as `O` (open) or `-` (closed), solenoids first.
pub fn render_channels(record: &TelemetryRecord, calibration: &Calibration) -> String {
    let indicators = calibration.valve_indicators(record);
    let lamp = |open: &bool| if *open { 'O' } else { '-' };
    let join = |values: &[f64]| {
        values
            .iter()
            .map(|v| format!("{:.1}", v))
            .collect::<Vec<_>>()
            .join(" ")
    };

    format!(
        "SV [{}] MV [{}] VA [{}] TC [{}]",
        indicators.solenoids.iter().map(lamp).collect::<String>(),
        indicators.motors.iter().map(lamp).collect::<String>(),
        join(&calibration.analog_values(record)),
        join(&calibration.thermocouple_values(record)),
    )
}

/// Rate label, e.g. `"48.9 Hz"`
pub fn format_rate(rate_hz: f64) -> String {
    format!("{:.1} Hz", rate_hz)
}
