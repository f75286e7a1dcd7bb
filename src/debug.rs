//! # Diagnostic Sink
//!
//! Human-readable, single-line diagnostics for the operator: non-telemetry
//! lines from the vehicle, decode failures and session events.
//!
//! This is separate from `tracing`; [`DebugLog`] mirrors what it receives into
//! `tracing` so the process log sees the same lines.

use chrono::Local;
use std::sync::Mutex;
use tracing::info;

use crate::history::BoundedHistory;
use crate::lock;

/// Default number of lines kept by [`DebugLog`]
pub const DEFAULT_DEBUG_LINES: usize = 100;

/// Receiver of diagnostic lines
pub trait DebugSink: Send + Sync {
    fn emit(&self, line: &str);
}

/// Bounded, timestamped diagnostic log
///
/// Each line is stored as `HH:MM:SS.mmm : <line>`.
#[derive(Debug)]
pub struct DebugLog {
    lines: Mutex<BoundedHistory<String>>,
}

impl DebugLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: Mutex::new(BoundedHistory::new(capacity)),
        }
    }

    /// Stored lines, oldest first
    pub fn lines(&self) -> Vec<String> {
        lock(&self.lines).snapshot()
    }

    /// Whether any stored line contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        lock(&self.lines).iter().any(|line| line.contains(needle))
    }
}

impl Default for DebugLog {
    fn default() -> Self {
        Self::new(DEFAULT_DEBUG_LINES)
    }
}

impl DebugSink for DebugLog {
    fn emit(&self, line: &str) {
        info!(target: "gcs::debug", "{}", line);
        let stamped = format!("{} : {}", Local::now().format("%H:%M:%S%.3f"), line);
        lock(&self.lines).push(stamped);
    }
}
