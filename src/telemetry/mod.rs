//! # Telemetry Module
//!
//! Vehicle telemetry records and the CSV line codec.
//!
//! This module handles:
//! - The fixed telemetry schema shared by the UMB and TLM links
//! - Source identity and arrival-stamped packets
//! - Decoding a CSV line into a record (all-or-nothing)

pub mod codec;
pub mod record;

pub use codec::{decode, DecodeError};
pub use record::{Attitude, PerSource, ReceivedPacket, SourceId, TelemetryRecord};
