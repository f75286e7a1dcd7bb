//! # Calibration Module
//!
//! Converts raw analog and thermocouple counts into engineering values for
//! the presentation layer, and interprets valve readings for indicators.
//!
//! ## Affine Transform
//!
//! Each channel has a gain and an offset:
//!
//! `value = raw * gain + offset`
//!
//! The identity (`gain = 1.0`, `offset = 0.0`) passes raw counts through.
//!
//! ## Valve Indicators
//!
//! - Solenoid valves report `1` when open, anything else reads closed.
//! - Motor valves report an angle (0-180°); an angle at or above the open
//!   threshold (default 90°) reads open. This is a display decision only.
//!
//! ## Usage
//!
//! ```
//! use gcs_telemetry::display::calibration::ChannelCalibration;
//!
//! let pressure = ChannelCalibration::new(0.0122, -1.25);
//! assert!((pressure.apply(1024.0) - 11.2428).abs() < 1e-4);
//! ```

use serde::Deserialize;

use crate::telemetry::record::{
    TelemetryRecord, ANALOG_CHANNEL_COUNT, THERMOCOUPLE_COUNT, VALVE_ANGLE_COUNT,
    VALVE_STATE_COUNT,
};

/// Default motor valve open threshold in degrees
pub const DEFAULT_VALVE_OPEN_THRESHOLD_DEG: f64 = 90.0;

/// Gain and offset for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ChannelCalibration {
    /// Multiplier applied to the raw reading.
    #[serde(default = "default_gain")]
    pub gain: f64,
    /// Added after scaling.
    #[serde(default)]
    pub offset: f64,
}

fn default_gain() -> f64 {
    1.0
}

impl Default for ChannelCalibration {
    fn default() -> Self {
        Self::identity()
    }
}

impl ChannelCalibration {
    /// Creates a calibration with the given gain and offset.
    #[must_use]
    pub fn new(gain: f64, offset: f64) -> Self {
        Self { gain, offset }
    }

    /// Creates a pass-through calibration.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            gain: 1.0,
            offset: 0.0,
        }
    }

    /// Applies `raw * gain + offset`.
    #[must_use]
    pub fn apply(&self, raw: f64) -> f64 {
        raw * self.gain + self.offset
    }

    /// Whether both coefficients are finite numbers.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.gain.is_finite() && self.offset.is_finite()
    }
}

/// Open/closed reading of every valve in a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValveIndicators {
    pub solenoids: [bool; VALVE_STATE_COUNT],
    pub motors: [bool; VALVE_ANGLE_COUNT],
}

/// Calibration settings for every analog and thermocouple channel.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Calibration {
    /// Per analog channel (va1..va8).
    #[serde(default = "default_analog")]
    pub analog: [ChannelCalibration; ANALOG_CHANNEL_COUNT],

    /// Per thermocouple channel (tc1..tc6).
    #[serde(default = "default_thermocouple")]
    pub thermocouple: [ChannelCalibration; THERMOCOUPLE_COUNT],

    /// Motor valve angle at or above which the valve reads open.
    #[serde(default = "default_valve_open_threshold_deg")]
    pub valve_open_threshold_deg: f64,
}

fn default_analog() -> [ChannelCalibration; ANALOG_CHANNEL_COUNT] {
    [ChannelCalibration::identity(); ANALOG_CHANNEL_COUNT]
}

fn default_thermocouple() -> [ChannelCalibration; THERMOCOUPLE_COUNT] {
    [ChannelCalibration::identity(); THERMOCOUPLE_COUNT]
}

fn default_valve_open_threshold_deg() -> f64 {
    DEFAULT_VALVE_OPEN_THRESHOLD_DEG
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            analog: default_analog(),
            thermocouple: default_thermocouple(),
            valve_open_threshold_deg: DEFAULT_VALVE_OPEN_THRESHOLD_DEG,
        }
    }
}

impl Calibration {
    /// Calibrated analog channels of `record`.
    #[must_use]
    pub fn analog_values(&self, record: &TelemetryRecord) -> [f64; ANALOG_CHANNEL_COUNT] {
        apply_all(&self.analog, &record.analog_channels)
    }

    /// Calibrated thermocouple channels of `record`.
    #[must_use]
    pub fn thermocouple_values(&self, record: &TelemetryRecord) -> [f64; THERMOCOUPLE_COUNT] {
        apply_all(&self.thermocouple, &record.thermocouples)
    }

    /// Whether a motor valve at `angle` degrees reads open.
    #[must_use]
    pub fn motor_valve_open(&self, angle: f64) -> bool {
        angle >= self.valve_open_threshold_deg
    }

    /// Valve indicator states for `record`.
    ///
    /// # Examples
    ///
    /// ```
    /// use gcs_telemetry::display::calibration::Calibration;
    /// use gcs_telemetry::telemetry::codec::decode;
    ///
    /// let record = decode(
    ///     "0,0,0,1,0,0,0,0,0,0,0,89.9,90,180,0,\
    ///      0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0",
    /// ).unwrap();
    /// let valves = Calibration::default().valve_indicators(&record);
    /// assert!(valves.solenoids[0]);
    /// assert_eq!(valves.motors, [false, true, true, false]);
    /// ```
    #[must_use]
    pub fn valve_indicators(&self, record: &TelemetryRecord) -> ValveIndicators {
        ValveIndicators {
            solenoids: record.valve_states.map(solenoid_open),
            motors: record.valve_angles.map(|angle| self.motor_valve_open(angle)),
        }
    }
}

/// Whether a solenoid valve state reads open.
#[must_use]
pub fn solenoid_open(state: i32) -> bool {
    state == 1
}

fn apply_all<const N: usize>(calibrations: &[ChannelCalibration; N], raw: &[f64; N]) -> [f64; N] {
    let mut out = [0.0; N];
    for ((value, cal), raw) in out.iter_mut().zip(calibrations).zip(raw) {
        *value = cal.apply(*raw);
    }
    out
}
