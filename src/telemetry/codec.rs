//! # Telemetry Line Codec
//!
//! Decodes one comma-separated telemetry line into a [`TelemetryRecord`].
//!
//! Field offsets are fixed:
//!
//! | Offset | Field            |
//! |--------|------------------|
//! | 0      | boot_time        |
//! | 1      | temperature      |
//! | 2      | voltage          |
//! | 3-10   | valve_states     |
//! | 11-14  | valve_angles     |
//! | 15-22  | analog_channels  |
//! | 23-28  | thermocouples    |
//! | 29-31  | roll, pitch, yaw |
//! | 32-36  | fault_flags      |
//!
//! Decoding is all-or-nothing: the first field that is absent or fails its
//! numeric conversion rejects the whole line. Fields past offset 36 are ignored.

use std::str::FromStr;
use thiserror::Error;

use super::record::{
    Attitude, TelemetryRecord, ANALOG_CHANNEL_COUNT, FAULT_FLAG_COUNT, THERMOCOUPLE_COUNT,
    VALVE_ANGLE_COUNT, VALVE_STATE_COUNT,
};

/// Field delimiter on the wire
pub const FIELD_DELIMITER: char = ',';

/// Lines with fewer fields are rejected before any conversion
pub const MIN_FIELDS: usize = 10;

const BOOT_TIME: usize = 0;
const TEMPERATURE: usize = 1;
const VOLTAGE: usize = 2;
const VALVE_STATES: usize = 3;
const VALVE_ANGLES: usize = VALVE_STATES + VALVE_STATE_COUNT;
const ANALOG_CHANNELS: usize = VALVE_ANGLES + VALVE_ANGLE_COUNT;
const THERMOCOUPLES: usize = ANALOG_CHANNELS + ANALOG_CHANNEL_COUNT;
const ROLL: usize = THERMOCOUPLES + THERMOCOUPLE_COUNT;
const PITCH: usize = ROLL + 1;
const YAW: usize = ROLL + 2;
const FAULT_FLAGS: usize = ROLL + 3;

/// Why a telemetry line was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Fewer than [`MIN_FIELDS`] fields
    #[error("Incomplete CSV data ({fields} fields)")]
    Incomplete { fields: usize },

    /// The line ended before a required field
    #[error("missing field {index}")]
    MissingField { index: usize },

    /// A field failed its numeric conversion
    #[error("invalid value '{raw}' at field {index}")]
    FieldParse { index: usize, raw: String },
}

/// Decode a telemetry line
///
/// # Arguments
///
/// * `line` - One CSV line, with or without surrounding whitespace
///
/// # Returns
///
/// * `Result<TelemetryRecord, DecodeError>` - The record, or why it was rejected
///
/// # Examples
///
/// ```
/// use gcs_telemetry::telemetry::codec::decode;
///
/// let line = "1200,24.5,11.9,1,0,0,0,0,0,0,1,0,90,180,0,\
///             512,511,510,509,508,507,506,505,100,101,102,103,104,105,\
///             1.5,-2.0,180.0,0,0,0,0,0";
/// let record = decode(line).unwrap();
/// assert_eq!(record.boot_time, 1200);
/// assert_eq!(record.valve_angles[2], 180.0);
/// ```
pub fn decode(line: &str) -> Result<TelemetryRecord, DecodeError> {
    let fields = Fields::split(line);
    if fields.len() < MIN_FIELDS {
        return Err(DecodeError::Incomplete {
            fields: fields.len(),
        });
    }

    Ok(TelemetryRecord {
        boot_time: fields.parse(BOOT_TIME)?,
        temperature: fields.parse(TEMPERATURE)?,
        voltage: fields.parse(VOLTAGE)?,
        valve_states: fields.array(VALVE_STATES)?,
        valve_angles: fields.array(VALVE_ANGLES)?,
        analog_channels: fields.array(ANALOG_CHANNELS)?,
        thermocouples: fields.array(THERMOCOUPLES)?,
        attitude: Attitude {
            roll: fields.parse(ROLL)?,
            pitch: fields.parse(PITCH)?,
            yaw: fields.parse(YAW)?,
        },
        fault_flags: fields.array(FAULT_FLAGS)?,
    })
}

struct Fields<'a>(Vec<&'a str>);

impl<'a> Fields<'a> {
    fn split(line: &'a str) -> Self {
        Self(line.trim().split(FIELD_DELIMITER).map(str::trim).collect())
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn parse<T: FromStr>(&self, index: usize) -> Result<T, DecodeError> {
        let raw = self
            .0
            .get(index)
            .ok_or(DecodeError::MissingField { index })?;
        raw.parse().map_err(|_| DecodeError::FieldParse {
            index,
            raw: (*raw).to_string(),
        })
    }

    fn array<T: FromStr + Copy + Default, const N: usize>(
        &self,
        start: usize,
    ) -> Result<[T; N], DecodeError> {
        let mut out = [T::default(); N];
        for (offset, slot) in out.iter_mut().enumerate() {
            *slot = self.parse(start + offset)?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A valid 37-field line with distinct values per group.
    fn full_line() -> Vec<String> {
        let mut fields = vec!["5000".to_string(), "21.5".to_string(), "12.6".to_string()];
        fields.extend((0..8).map(|i| (i % 2).to_string()));
        fields.extend((0..4).map(|i| format!("{}.0", i * 45)));
        fields.extend((0..8).map(|i| format!("{}.5", 100 + i)));
        fields.extend((0..6).map(|i| format!("{}", 200 + i)));
        fields.extend(["10.5".to_string(), "-20.25".to_string(), "359.0".to_string()]);
        fields.extend((0..5).map(|i| if i == 3 { "1" } else { "0" }.to_string()));
        fields
    }

    #[test]
    fn test_decode_maps_fixed_offsets() {
        let record = decode(&full_line().join(",")).unwrap();

        assert_eq!(record.boot_time, 5000);
        assert_eq!(record.temperature, 21.5);
        assert_eq!(record.voltage, 12.6);
        assert_eq!(record.valve_states, [0, 1, 0, 1, 0, 1, 0, 1]);
        assert_eq!(record.valve_angles, [0.0, 45.0, 90.0, 135.0]);
        assert_eq!(
            record.analog_channels,
            [100.5, 101.5, 102.5, 103.5, 104.5, 105.5, 106.5, 107.5]
        );
        assert_eq!(record.thermocouples, [200.0, 201.0, 202.0, 203.0, 204.0, 205.0]);
        assert_eq!(record.attitude.roll, 10.5);
        assert_eq!(record.attitude.pitch, -20.25);
        assert_eq!(record.attitude.yaw, 359.0);
        assert_eq!(record.fault_flags, [0, 0, 0, 1, 0]);
    }

    #[test]
    fn test_decode_tolerates_whitespace() {
        let line = format!("  {}\r\n", full_line().join(" , "));
        assert!(decode(&line).is_ok());
    }

    #[test]
    fn test_decode_ignores_trailing_fields() {
        let mut fields = full_line();
        fields.push("extra".to_string());
        fields.push("999".to_string());
        assert_eq!(decode(&fields.join(",")).unwrap().boot_time, 5000);
    }

    #[test]
    fn test_decode_fewer_than_ten_fields_is_incomplete() {
        let line = full_line()[..9].join(",");
        assert_eq!(decode(&line), Err(DecodeError::Incomplete { fields: 9 }));

        assert_eq!(decode("1,2"), Err(DecodeError::Incomplete { fields: 2 }));
    }

    #[test]
    fn test_decode_truncated_line_reports_first_missing_field() {
        let line = full_line()[..20].join(",");
        assert_eq!(decode(&line), Err(DecodeError::MissingField { index: 20 }));

        let line = full_line()[..36].join(",");
        assert_eq!(decode(&line), Err(DecodeError::MissingField { index: 36 }));
    }

    #[test]
    fn test_decode_rejects_non_numeric_field() {
        let mut fields = full_line();
        fields[15] = "abc".to_string();
        assert_eq!(
            decode(&fields.join(",")),
            Err(DecodeError::FieldParse {
                index: 15,
                raw: "abc".to_string()
            })
        );
    }

    #[test]
    fn test_decode_rejects_float_in_integer_field() {
        let mut fields = full_line();
        fields[0] = "12.5".to_string();
        assert!(matches!(
            decode(&fields.join(",")),
            Err(DecodeError::FieldParse { index: 0, .. })
        ));

        let mut fields = full_line();
        fields[34] = "0.5".to_string();
        assert!(matches!(
            decode(&fields.join(",")),
            Err(DecodeError::FieldParse { index: 34, .. })
        ));
    }

    #[test]
    fn test_decode_empty_field_is_parse_error() {
        let mut fields = full_line();
        fields[30] = String::new();
        assert_eq!(
            decode(&fields.join(",")),
            Err(DecodeError::FieldParse {
                index: 30,
                raw: String::new()
            })
        );
    }

    #[test]
    fn test_offsets_cover_all_fields() {
        assert_eq!(FAULT_FLAGS + FAULT_FLAG_COUNT, TelemetryRecord::FIELD_COUNT);
        assert_eq!(VALVE_ANGLES, 11);
        assert_eq!(ANALOG_CHANNELS, 15);
        assert_eq!(THERMOCOUPLES, 23);
        assert_eq!(ROLL, 29);
        assert_eq!(FAULT_FLAGS, 32);
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            DecodeError::Incomplete { fields: 3 }.to_string(),
            "Incomplete CSV data (3 fields)"
        );
        assert_eq!(
            DecodeError::FieldParse {
                index: 4,
                raw: "x".to_string()
            }
            .to_string(),
            "invalid value 'x' at field 4"
        );
    }
}
