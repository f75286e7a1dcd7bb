//! # Ingest Module
//!
//! Per-link line ingestion and arrival-rate tracking.
//!
//! This module handles:
//! - Classifying raw lines as telemetry or diagnostics
//! - Decoding telemetry lines and stamping arrival time
//! - Counting accepted packets for the rate monitor
//! - Reporting malformed lines without interrupting the stream

pub mod rate;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, trace};

use crate::debug::DebugSink;
use crate::error::GcsError;
use crate::lock;
use crate::telemetry::codec::{self, FIELD_DELIMITER};
use crate::telemetry::record::{ReceivedPacket, SourceId};
use rate::RateSampler;

/// Ingestion state for one telemetry link
///
/// The packet counter is written only by ingestion; the rate sampler only by
/// the rate monitor and by (re)connection.
pub struct ChannelIngestor {
    source: SourceId,
    packet_count: AtomicU64,
    connected: AtomicBool,
    sampler: Mutex<RateSampler>,
    debug: Arc<dyn DebugSink>,
}

impl std::fmt::Debug for ChannelIngestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelIngestor")
            .field("source", &self.source)
            .field("packet_count", &self.packet_count())
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl ChannelIngestor {
    pub fn new(source: SourceId, debug: Arc<dyn DebugSink>) -> Self {
        Self {
            source,
            packet_count: AtomicU64::new(0),
            connected: AtomicBool::new(false),
            sampler: Mutex::new(RateSampler::new(Instant::now())),
            debug,
        }
    }

    pub fn source(&self) -> SourceId {
        self.source
    }

    /// Handle one line delivered by the link
    ///
    /// Empty lines are dropped. Lines without a field delimiter are forwarded
    /// to the diagnostic sink unchanged. Telemetry lines that fail to decode
    /// are reported and dropped; the counter only moves on success.
    ///
    /// # Returns
    ///
    /// * `Option<ReceivedPacket>` - The stamped packet for an accepted line
    pub fn on_line_received(&self, raw: &[u8]) -> Option<ReceivedPacket> {
        let text = String::from_utf8_lossy(raw);
        let line = text.trim();
        if line.is_empty() {
            return None;
        }

        if !line.contains(FIELD_DELIMITER) {
            self.debug.emit(line);
            return None;
        }

        match codec::decode(line) {
            Ok(record) => {
                self.packet_count.fetch_add(1, Ordering::Relaxed);
                trace!("[{}] accepted packet boot_time={}", self.source, record.boot_time);
                Some(ReceivedPacket::now(record, self.source))
            }
            Err(e) => {
                debug!("[{}] dropped line: {}", self.source, e);
                self.debug
                    .emit(&format!("[{}] {}", self.source, GcsError::from(e)));
                None
            }
        }
    }

    /// Packets accepted since the last connection
    pub fn packet_count(&self) -> u64 {
        self.packet_count.load(Ordering::Relaxed)
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Marks the link connected and starts a fresh counting window
    pub fn mark_connected(&self, now: Instant) {
        self.packet_count.store(0, Ordering::Relaxed);
        lock(&self.sampler).reset(now, 0);
        self.connected.store(true, Ordering::Release);
    }

    pub fn mark_disconnected(&self) {
        self.connected.store(false, Ordering::Release);
    }

    /// Takes one rate sample at `now`
    pub fn sample_rate(&self, now: Instant) -> f64 {
        let count = self.packet_count();
        let connected = self.is_connected();
        lock(&self.sampler).sample(now, count, connected)
    }

    /// Rate from the most recent sample, 0.0 while disconnected
    pub fn rate_hz(&self) -> f64 {
        if !self.is_connected() {
            return 0.0;
        }
        lock(&self.sampler).rate_hz()
    }
}
