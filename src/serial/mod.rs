//! # Serial Communication Module
//!
//! Handles the serial links to the vehicle (UMB umbilical and TLM radio).
//!
//! This module handles:
//! - Opening a serial device with 8N1, no flow control
//! - Splitting the stream into a line reader and a command writer
//! - Framing received bytes into newline-terminated lines

pub mod framer;
pub mod port_trait;

use crate::error::{GcsError, Result};
use port_trait::{FramedLineSource, TokioSerialPort};
use tokio::io::{ReadHalf, WriteHalf};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info};

/// Default baud rate for both links
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Baud rates accepted by the configuration
pub const SUPPORTED_BAUD_RATES: &[u32] = &[
    9_600, 19_200, 38_400, 57_600, 115_200, 230_400, 460_800, 921_600,
];

/// Line reader half of an opened link
pub type SerialLines = FramedLineSource<ReadHalf<SerialStream>>;

/// Command writer half of an opened link
pub type SerialCommands = TokioSerialPort<WriteHalf<SerialStream>>;

/// An opened serial link, split into its reader and writer halves
pub struct SerialLink {
    pub lines: SerialLines,
    pub commands: SerialCommands,
    device_path: String,
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl SerialLink {
    /// Open a serial device
    ///
    /// # Arguments
    ///
    /// * `path` - Device path (e.g., "/dev/ttyUSB0")
    /// * `baud_rate` - Line speed
    ///
    /// # Errors
    ///
    /// Returns `GcsError::Serial` if the device cannot be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use gcs_telemetry::serial::SerialLink;
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let link = SerialLink::open("/dev/ttyUSB0", 115_200)?;
    ///     println!("Opened {}", link.device_path());
    ///     Ok(())
    /// }
    /// ```
    pub fn open(path: &str, baud_rate: u32) -> Result<Self> {
        debug!("Trying to open serial port: {} @ {}", path, baud_rate);
        let port = open_port(path, baud_rate)?;
        info!("Opened serial device {} @ {} baud", path, baud_rate);

        let (reader, writer) = tokio::io::split(port);
        Ok(Self {
            lines: FramedLineSource::new(reader),
            commands: TokioSerialPort::new(writer),
            device_path: path.to_string(),
        })
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

/// Open a specific serial port with 8N1 settings
fn open_port(path: &str, baud_rate: u32) -> Result<SerialStream> {
    let port = tokio_serial::new(path, baud_rate)
        .data_bits(tokio_serial::DataBits::Eight)
        .parity(tokio_serial::Parity::None)
        .stop_bits(tokio_serial::StopBits::One)
        .flow_control(tokio_serial::FlowControl::None)
        .open_native_async()
        .map_err(|e| GcsError::Serial(format!("Failed to open {}: {}", path, e)))?;

    Ok(port)
}
