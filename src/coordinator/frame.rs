//! # Display Frames
//!
//! What the presentation layer reads on each refresh tick.

use super::Coordinator;
use crate::telemetry::record::{PerSource, SourceId, TelemetryRecord};

/// Read-only view of the core state for one refresh
#[derive(Debug, Clone)]
pub struct DisplayFrame {
    pub active_source: SourceId,

    /// Display history, oldest first
    pub records: Vec<TelemetryRecord>,

    /// Most recent display record
    pub latest: Option<TelemetryRecord>,

    /// Display appends so far; changes whenever `records` does
    pub sequence: u64,

    pub rates: PerSource<f64>,
    pub connected: PerSource<bool>,
    pub logging: bool,
}

/// Tracks what the presentation layer has already drawn
///
/// `poll` yields a frame only when the display history advanced since the
/// previous frame, so a refresh tick without new data redraws nothing.
#[derive(Debug, Default)]
pub struct RefreshCursor {
    last_sequence: u64,
}

impl RefreshCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next frame if new display data arrived
    pub fn poll(&mut self, coordinator: &Coordinator) -> Option<DisplayFrame> {
        if coordinator.display_sequence() == self.last_sequence {
            return None;
        }
        let frame = coordinator.display_frame();
        self.last_sequence = frame.sequence;
        Some(frame)
    }
}
