//! # Valve Command Encoder
//!
//! Encodes valve actuation commands sent to the vehicle over a link.
//!
//! Wire format, ASCII, one command per line:
//!
//! - Solenoid valve: `:SV;<index>;<0|1>#\n`
//! - Motor valve:    `:MV;<index>;<0|180>#\n`

use crate::error::{GcsError, Result};
use crate::telemetry::record::{VALVE_ANGLE_COUNT, VALVE_STATE_COUNT};

/// Motor valve angle commanded for "open"
pub const MOTOR_VALVE_OPEN_ANGLE: u16 = 180;

/// Motor valve angle commanded for "closed"
pub const MOTOR_VALVE_CLOSED_ANGLE: u16 = 0;

/// A single valve actuation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValveCommand {
    Solenoid { index: usize, open: bool },
    Motor { index: usize, open: bool },
}

impl ValveCommand {
    /// Solenoid valve command
    ///
    /// # Errors
    ///
    /// Returns `GcsError::InvalidCommand` if `index` is not a solenoid (0-7)
    pub fn solenoid(index: usize, open: bool) -> Result<Self> {
        if index >= VALVE_STATE_COUNT {
            return Err(GcsError::InvalidCommand(format!(
                "solenoid valve index {} out of range (0-{})",
                index,
                VALVE_STATE_COUNT - 1
            )));
        }
        Ok(Self::Solenoid { index, open })
    }

    /// Motor valve command
    ///
    /// # Errors
    ///
    /// Returns `GcsError::InvalidCommand` if `index` is not a motor valve (0-3)
    pub fn motor(index: usize, open: bool) -> Result<Self> {
        if index >= VALVE_ANGLE_COUNT {
            return Err(GcsError::InvalidCommand(format!(
                "motor valve index {} out of range (0-{})",
                index,
                VALVE_ANGLE_COUNT - 1
            )));
        }
        Ok(Self::Motor { index, open })
    }

    /// Encode as a newline-terminated command line
    ///
    /// # Examples
    ///
    /// ```
    /// use gcs_telemetry::command::ValveCommand;
    ///
    /// let cmd = ValveCommand::motor(2, true).unwrap();
    /// assert_eq!(cmd.encode(), ":MV;2;180#\n");
    /// ```
    pub fn encode(&self) -> String {
        match *self {
            Self::Solenoid { index, open } => format!(":SV;{};{}#\n", index, u8::from(open)),
            Self::Motor { index, open } => {
                let angle = if open {
                    MOTOR_VALVE_OPEN_ANGLE
                } else {
                    MOTOR_VALVE_CLOSED_ANGLE
                };
                format!(":MV;{};{}#\n", index, angle)
            }
        }
    }
}
