//! # Coordinator Module
//!
//! Ties the two telemetry links to history, logging and display state.
//!
//! This module handles:
//! - Connecting and disconnecting links (one reader task per link)
//! - Routing accepted packets to per-link history, the log and the display
//! - Active source selection and display seeding on switch
//! - Logging session toggling and the periodic flush timer
//! - The 1 Hz rate monitor
//! - Valve commands to a connected link

pub mod frame;

use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::command::ValveCommand;
use crate::config::Config;
use crate::debug::DebugSink;
use crate::error::{GcsError, Result};
use crate::history::HistoryManager;
use crate::ingest::rate::RATE_SAMPLE_INTERVAL;
use crate::ingest::ChannelIngestor;
use crate::lock;
use crate::recorder::LogWriter;
use crate::serial::port_trait::{LineSource, SerialPortIO};
use crate::serial::SerialLink;
use crate::telemetry::record::{PerSource, ReceivedPacket, SourceId, TelemetryRecord};
use frame::DisplayFrame;

/// Writer half of a connected link, shared with in-flight commands
type CommandLink = Arc<tokio::sync::Mutex<Box<dyn SerialPortIO>>>;

/// State of the logging session after a toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingState {
    Idle,
    Active,
}

/// Core state shared by the reader tasks, the timers and the operator
pub struct Coordinator {
    ingestors: PerSource<Arc<ChannelIngestor>>,
    readers: PerSource<Mutex<Option<JoinHandle<()>>>>,
    commands: PerSource<Mutex<Option<CommandLink>>>,
    history: HistoryManager,

    /// Held from a packet's history append through its display decision,
    /// so a switch cannot interleave
    active: Mutex<SourceId>,

    log: Arc<LogWriter>,
    flush_interval: Duration,

    /// Also serializes logging start and stop
    flush_task: Mutex<Option<JoinHandle<()>>>,
    rate_task: Mutex<Option<JoinHandle<()>>>,
    debug: Arc<dyn DebugSink>,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("active_source", &self.active_source())
            .field("connected", &self.connected_sources())
            .field("logging", &self.is_logging())
            .finish_non_exhaustive()
    }
}

impl Coordinator {
    /// Creates a coordinator logging CSV files into the configured directory
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `debug` - Receives operator-facing diagnostics
    pub fn new(config: &Config, debug: Arc<dyn DebugSink>) -> Arc<Self> {
        let log = LogWriter::to_directory(
            &config.logging.log_dir,
            config.logging.buffer_capacity,
            Arc::clone(&debug),
        );
        Self::with_log_writer(config, log, debug)
    }

    /// Creates a coordinator around an existing log writer
    pub fn with_log_writer(config: &Config, log: LogWriter, debug: Arc<dyn DebugSink>) -> Arc<Self> {
        Arc::new(Self {
            ingestors: PerSource::from_fn(|source| {
                Arc::new(ChannelIngestor::new(source, Arc::clone(&debug)))
            }),
            readers: PerSource::from_fn(|_| Mutex::new(None)),
            commands: PerSource::from_fn(|_| Mutex::new(None)),
            history: HistoryManager::new(config.history.capacity),
            active: Mutex::new(config.display.default_source),
            log: Arc::new(log),
            flush_interval: config.logging.flush_interval(),
            flush_task: Mutex::new(None),
            rate_task: Mutex::new(None),
            debug,
        })
    }

    /// Route an accepted packet
    ///
    /// The record goes to its link's history and, while logging, to the log.
    /// It reaches the display history only if its link is the active source.
    pub fn on_packet(&self, packet: ReceivedPacket) {
        {
            let active = lock(&self.active);
            self.history.append(packet.source, packet.record.clone());
            if *active == packet.source {
                self.history.append_display(packet.record.clone());
            }
        }
        self.log.append(&packet);
    }

    pub fn active_source(&self) -> SourceId {
        *lock(&self.active)
    }

    /// Select which link feeds the display
    ///
    /// On a change, the new source's most recent record (if any) is appended
    /// to the display so the view updates without waiting for a packet.
    ///
    /// # Returns
    ///
    /// * `bool` - `false` if `source` was already active
    pub fn set_active_source(&self, source: SourceId) -> bool {
        {
            let mut active = lock(&self.active);
            if *active == source {
                return false;
            }
            *active = source;
            if let Some(record) = self.history.latest(source) {
                self.history.append_display(record);
            }
        }

        self.debug
            .emit(&format!("[CORE] Active Source changed to: {}", source));
        true
    }

    pub fn is_connected(&self, source: SourceId) -> bool {
        self.ingestors[source].is_connected()
    }

    pub fn connected_sources(&self) -> Vec<SourceId> {
        SourceId::ALL
            .into_iter()
            .filter(|&source| self.is_connected(source))
            .collect()
    }

    /// Open a serial device and start reading from it
    ///
    /// # Errors
    ///
    /// * `GcsError::AlreadyConnected` - the link already has a reader
    /// * `GcsError::Connection` - the device could not be opened
    pub fn connect(self: &Arc<Self>, source: SourceId, port: &str, baud_rate: u32) -> Result<()> {
        if self.is_connected(source) {
            return Err(GcsError::AlreadyConnected(source));
        }

        let link = SerialLink::open(port, baud_rate).map_err(|e| {
            self.debug
                .emit(&format!("[{}] Failed to open {} serial port.", source, source));
            GcsError::Connection {
                channel: source,
                reason: e.to_string(),
            }
        })?;

        self.connect_with(source, Box::new(link.lines), Some(Box::new(link.commands)))?;
        self.debug.emit(&format!(
            "[{}] Connected to {} at {} baud",
            source, port, baud_rate
        ));
        Ok(())
    }

    /// Start reading a link from an already opened line source
    ///
    /// Resets the link's packet count and rate baseline. Must be called
    /// from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `GcsError::AlreadyConnected` if the link's reader is still running
    pub fn connect_with(
        self: &Arc<Self>,
        source: SourceId,
        lines: Box<dyn LineSource>,
        commands: Option<Box<dyn SerialPortIO>>,
    ) -> Result<()> {
        let ingestor = Arc::clone(&self.ingestors[source]);
        let mut reader = lock(&self.readers[source]);
        // a reader that has already marked the link down is only winding up
        if ingestor.is_connected() && reader.as_ref().is_some_and(|task| !task.is_finished()) {
            return Err(GcsError::AlreadyConnected(source));
        }
        if let Some(previous) = reader.take() {
            previous.abort();
        }

        ingestor.mark_connected(Instant::now());
        *lock(&self.commands[source]) = commands.map(|port| Arc::new(tokio::sync::Mutex::new(port)));

        *reader = Some(tokio::spawn(read_lines(
            Arc::downgrade(self),
            ingestor,
            lines,
            Arc::clone(&self.debug),
        )));
        info!("[{}] link connected", source);
        Ok(())
    }

    /// Stop reading a link
    ///
    /// Rows already buffered for the link's log are kept and written by the
    /// next flush.
    ///
    /// # Errors
    ///
    /// Returns `GcsError::NotConnected` if the link was never connected
    pub fn disconnect(&self, source: SourceId) -> Result<()> {
        let task = lock(&self.readers[source]).take();
        *lock(&self.commands[source]) = None;
        self.ingestors[source].mark_disconnected();

        match task {
            Some(task) => {
                task.abort();
                info!("[{}] link disconnected", source);
                self.debug.emit(&format!("[{}] Disconnected", source));
                Ok(())
            }
            None => Err(GcsError::NotConnected(source)),
        }
    }

    /// Send a valve command over a connected link
    ///
    /// # Errors
    ///
    /// * `GcsError::NotConnected` - the link has no open writer
    /// * `GcsError::Io` - the write failed
    pub async fn send_command(&self, source: SourceId, command: ValveCommand) -> Result<()> {
        let link = lock(&self.commands[source]).clone();
        let link = match link {
            Some(link) if self.is_connected(source) => link,
            _ => {
                self.debug
                    .emit(&format!("[{}] Not connected. Cannot send command.", source));
                return Err(GcsError::NotConnected(source));
            }
        };

        let line = command.encode();
        let mut port = link.lock().await;
        let written: std::io::Result<()> = async {
            port.write_all(line.as_bytes()).await?;
            port.flush().await
        }
        .await;

        if let Err(e) = written {
            self.debug.emit(&format!("[{}] Send error: {}", source, e));
            return Err(e.into());
        }
        debug!("[{}] sent {}", source, line.trim_end());
        Ok(())
    }

    pub fn is_logging(&self) -> bool {
        self.log.is_active()
    }

    /// Start a logging session for every connected link
    ///
    /// Spawns the flush timer, so it must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `GcsError::LogStartRejected` if a session is already active,
    /// no link is connected, or no log could be opened
    pub fn start_logging(&self) -> Result<()> {
        let sources = self.connected_sources();
        {
            let mut flush_task = lock(&self.flush_task);
            if self.log.is_active() {
                return Err(GcsError::LogStartRejected("session already active".into()));
            }
            if sources.is_empty() {
                self.debug.emit("[CORE] No connected sources to log");
                return Err(GcsError::LogStartRejected("no connected sources".into()));
            }
            if !self.log.start(&sources) {
                return Err(GcsError::LogStartRejected("no log could be opened".into()));
            }
            if let Some(previous) = flush_task.replace(self.spawn_flush_timer()) {
                previous.abort();
            }
        }

        let names: Vec<&str> = sources.iter().map(|s| s.as_str()).collect();
        self.debug.emit(&format!(
            "[CORE] Logging started for sources: {}",
            names.join(", ")
        ));
        Ok(())
    }

    /// End the logging session, flushing everything buffered
    ///
    /// # Returns
    ///
    /// * `bool` - `false` if no session was active
    pub fn stop_logging(&self) -> bool {
        let stopped = {
            let mut flush_task = lock(&self.flush_task);
            if let Some(task) = flush_task.take() {
                task.abort();
            }
            self.log.stop()
        };

        if stopped {
            self.debug.emit("[CORE] Logging stopped");
        }
        stopped
    }

    /// Start logging if idle, stop it if active
    ///
    /// # Errors
    ///
    /// Returns `GcsError::LogStartRejected` when a start is refused; the
    /// session stays idle
    pub fn toggle_logging(&self) -> Result<LoggingState> {
        if self.is_logging() {
            self.stop_logging();
            Ok(LoggingState::Idle)
        } else {
            self.start_logging().map(|()| LoggingState::Active)
        }
    }

    /// Rows buffered for a link's log
    pub fn pending_log_rows(&self, source: SourceId) -> usize {
        self.log.pending(source)
    }

    fn spawn_flush_timer(&self) -> JoinHandle<()> {
        let log = Arc::clone(&self.log);
        let period = self.flush_interval;
        tokio::spawn(async move {
            let mut ticker = interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                log.flush_pending();
            }
        })
    }

    /// Take one rate sample for both links
    pub fn sample_rates(&self) -> PerSource<f64> {
        let now = Instant::now();
        PerSource::from_fn(|source| self.ingestors[source].sample_rate(now))
    }

    /// Sample both links' packet rates once per second until shutdown
    pub fn spawn_rate_monitor(&self) {
        let ingestors = self.ingestors.clone();
        let task = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + RATE_SAMPLE_INTERVAL;
            let mut ticker = interval_at(start, RATE_SAMPLE_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let now = Instant::now();
                for (source, ingestor) in ingestors.iter() {
                    let rate = ingestor.sample_rate(now);
                    trace!("[{}] {:.1} Hz", source, rate);
                }
            }
        });

        if let Some(previous) = lock(&self.rate_task).replace(task) {
            previous.abort();
        }
    }

    /// Last sampled rate; 0 while disconnected
    pub fn rate_hz(&self, source: SourceId) -> f64 {
        self.ingestors[source].rate_hz()
    }

    pub fn packet_count(&self, source: SourceId) -> u64 {
        self.ingestors[source].packet_count()
    }

    /// Per-link history, oldest first
    pub fn history_snapshot(&self, source: SourceId) -> Vec<TelemetryRecord> {
        self.history.source_snapshot(source)
    }

    /// Display history, oldest first
    pub fn display_snapshot(&self) -> Vec<TelemetryRecord> {
        self.history.snapshot()
    }

    pub fn latest_record(&self, source: SourceId) -> Option<TelemetryRecord> {
        self.history.latest(source)
    }

    /// Display appends so far
    pub fn display_sequence(&self) -> u64 {
        self.history.display_appended()
    }

    pub fn display_frame(&self) -> DisplayFrame {
        let view = self.history.display_view();
        DisplayFrame {
            active_source: self.active_source(),
            records: view.records,
            latest: view.latest,
            sequence: view.appended,
            rates: PerSource::from_fn(|source| self.rate_hz(source)),
            connected: PerSource::from_fn(|source| self.is_connected(source)),
            logging: self.is_logging(),
        }
    }

    /// Stop timers, close both links and end any logging session
    pub fn shutdown(&self) {
        if let Some(task) = lock(&self.rate_task).take() {
            task.abort();
        }
        for source in SourceId::ALL {
            if self.disconnect(source).is_ok() {
                debug!("[{}] closed at shutdown", source);
            }
        }
        self.stop_logging();
        info!("Coordinator shut down");
    }
}

/// Reader task for one link
///
/// Runs until the stream ends, a read fails, or the coordinator is dropped.
async fn read_lines(
    coordinator: Weak<Coordinator>,
    ingestor: Arc<ChannelIngestor>,
    mut lines: Box<dyn LineSource>,
    debug: Arc<dyn DebugSink>,
) {
    let source = ingestor.source();
    loop {
        match lines.next_line().await {
            Ok(Some(raw)) => {
                let Some(packet) = ingestor.on_line_received(&raw) else {
                    continue;
                };
                match coordinator.upgrade() {
                    Some(coordinator) => coordinator.on_packet(packet),
                    None => break,
                }
            }
            Ok(None) => {
                info!("[{}] serial stream closed", source);
                debug.emit(&format!("[{}] Serial stream closed", source));
                break;
            }
            Err(e) => {
                warn!("[{}] read error: {}", source, e);
                debug.emit(&format!("[{}] Error while reading serial data: {}", source, e));
                break;
            }
        }
    }
    ingestor.mark_disconnected();
}
