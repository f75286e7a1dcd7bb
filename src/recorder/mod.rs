//! # Recorder Module
//!
//! Buffered per-link CSV logging of accepted packets.
//!
//! This module handles:
//! - Opening one log per connected link when a session starts
//! - Writing the header row once per log
//! - Buffering rows and flushing at capacity, on a timer and on stop
//! - Retaining rows whose flush failed until the next flush attempt
//!
//! Session lifecycle: `Idle -> start -> Active -> stop -> Idle`. `start`
//! while active and `stop` while idle are rejected.

pub mod row;
pub mod sink;

use chrono::{DateTime, Local};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::debug::DebugSink;
use crate::lock;
use crate::telemetry::record::{PerSource, ReceivedPacket, SourceId};
use sink::{CsvDirectory, RowSink, SinkOpener};

/// Rows buffered per link before an immediate flush
pub const DEFAULT_BUFFER_CAPACITY: usize = 100;

/// Period of the time-driven flush
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(1);

/// Open log for one link
struct SourceLog {
    sink: Box<dyn RowSink>,
    buffer: Vec<String>,
}

/// Session bookkeeping, touched only by `start` and `stop`
struct Session {
    opener: Box<dyn SinkOpener>,
    started_at: Option<DateTime<Local>>,
}

/// Buffered log writer for both links
///
/// Each link's log sits behind its own lock, so appending and flushing one
/// link never waits on the other's disk I/O. Lock order is session, then a
/// link's log.
pub struct LogWriter {
    session: Mutex<Session>,
    active: AtomicBool,
    capacity: usize,
    logs: PerSource<Mutex<Option<SourceLog>>>,
    debug: Arc<dyn DebugSink>,
}

impl std::fmt::Debug for LogWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogWriter")
            .field("capacity", &self.capacity)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

impl LogWriter {
    /// Creates an idle writer
    ///
    /// # Arguments
    ///
    /// * `opener` - Opens a sink per link at session start
    /// * `capacity` - Buffered rows per link that trigger a flush (at least 1)
    /// * `debug` - Receives write failures and session events
    pub fn new(opener: Box<dyn SinkOpener>, capacity: usize, debug: Arc<dyn DebugSink>) -> Self {
        Self {
            session: Mutex::new(Session {
                opener,
                started_at: None,
            }),
            active: AtomicBool::new(false),
            capacity: capacity.max(1),
            logs: PerSource::from_fn(|_| Mutex::new(None)),
            debug,
        }
    }

    /// Creates an idle writer logging CSV files into `dir`
    pub fn to_directory(
        dir: impl Into<PathBuf>,
        capacity: usize,
        debug: Arc<dyn DebugSink>,
    ) -> Self {
        Self::new(Box::new(CsvDirectory::new(dir)), capacity, debug)
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Links with an open log in the current session
    pub fn logging_sources(&self) -> Vec<SourceId> {
        SourceId::ALL
            .into_iter()
            .filter(|&source| lock(&self.logs[source]).is_some())
            .collect()
    }

    /// Rows waiting in the buffer of `source`
    pub fn pending(&self, source: SourceId) -> usize {
        lock(&self.logs[source])
            .as_ref()
            .map_or(0, |log| log.buffer.len())
    }

    /// Start a session
    ///
    /// Opens a fresh log with a header row for each requested link. A link
    /// whose log cannot be opened is reported and skipped.
    ///
    /// # Returns
    ///
    /// * `bool` - `false` if a session was already active or no log could be opened
    pub fn start(&self, sources: &[SourceId]) -> bool {
        let mut session = lock(&self.session);
        if session.started_at.is_some() {
            return false;
        }

        let started_at = Local::now();
        let mut opened = Vec::with_capacity(sources.len());
        for &source in sources {
            match self.open_log(session.opener.as_mut(), source, &started_at) {
                Ok(log) => {
                    *lock(&self.logs[source]) = Some(log);
                    opened.push(source);
                }
                Err(e) => {
                    warn!("[{}] could not open log: {}", source, e);
                    self.debug
                        .emit(&format!("[LOG] {} log could not be opened: {}", source, e));
                }
            }
        }

        if opened.is_empty() {
            return false;
        }

        session.started_at = Some(started_at);
        self.active.store(true, Ordering::Release);
        info!("Logging session started for {:?}", opened);
        true
    }

    fn open_log(
        &self,
        opener: &mut dyn SinkOpener,
        source: SourceId,
        started_at: &DateTime<Local>,
    ) -> std::io::Result<SourceLog> {
        let mut sink = opener.open(source, started_at)?;
        sink.write_rows(&[row::header()])?;
        Ok(SourceLog {
            sink,
            buffer: Vec::with_capacity(self.capacity),
        })
    }

    /// Buffer one packet; flushes that link when its buffer reaches capacity
    ///
    /// No-op while idle or when the packet's link has no open log.
    pub fn append(&self, packet: &ReceivedPacket) {
        let mut slot = lock(&self.logs[packet.source]);
        let Some(log) = slot.as_mut() else {
            return;
        };

        log.buffer.push(row::flatten(packet));
        if log.buffer.len() >= self.capacity {
            self.flush_log(packet.source, log);
        }
    }

    /// Flush every link with buffered rows (timer path)
    pub fn flush_pending(&self) {
        for source in SourceId::ALL {
            if let Some(log) = lock(&self.logs[source]).as_mut() {
                self.flush_log(source, log);
            }
        }
    }

    /// Writes the buffer of one link; rows stay buffered if the write fails
    fn flush_log(&self, source: SourceId, log: &mut SourceLog) -> bool {
        if log.buffer.is_empty() {
            return true;
        }

        match log.sink.write_rows(&log.buffer) {
            Ok(()) => {
                debug!("[{}] flushed {} rows", source, log.buffer.len());
                log.buffer.clear();
                true
            }
            Err(e) => {
                warn!("[{}] log flush failed: {}", source, e);
                self.debug.emit(&format!(
                    "[LOG] {} write failed, {} rows kept for retry: {}",
                    source,
                    log.buffer.len(),
                    e
                ));
                false
            }
        }
    }

    /// Stop the session
    ///
    /// Flushes every buffer regardless of size, closes the logs and returns to
    /// idle. Write failures are reported but do not keep the session open.
    ///
    /// # Returns
    ///
    /// * `bool` - `false` if no session was active
    pub fn stop(&self) -> bool {
        let mut session = lock(&self.session);
        if session.started_at.take().is_none() {
            return false;
        }
        self.active.store(false, Ordering::Release);

        for source in SourceId::ALL {
            // Detach first so the other link's appends never wait on this I/O
            let Some(mut log) = lock(&self.logs[source]).take() else {
                continue;
            };
            if !self.flush_log(source, &mut log) {
                self.debug.emit(&format!(
                    "[LOG] {} rows lost at stop: {}",
                    source,
                    log.buffer.len()
                ));
            }
            if let Err(e) = log.sink.close() {
                warn!("[{}] log close failed: {}", source, e);
                self.debug
                    .emit(&format!("[LOG] {} log close failed: {}", source, e));
            }
        }

        info!("Logging session stopped");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::sink::mocks::MemoryLogs;
    use super::*;
    use crate::debug::DebugLog;
    use crate::ingest::tests::valid_line;
    use crate::telemetry::codec::decode;
    use tempfile::TempDir;

    fn packet(source: SourceId, boot_time: i64) -> ReceivedPacket {
        ReceivedPacket::now(decode(&valid_line(boot_time)).unwrap(), source)
    }

    fn memory_writer() -> (LogWriter, MemoryLogs, Arc<DebugLog>) {
        let logs = MemoryLogs::default();
        let debug = Arc::new(DebugLog::default());
        let writer = LogWriter::new(
            Box::new(logs.clone()),
            DEFAULT_BUFFER_CAPACITY,
            debug.clone(),
        );
        (writer, logs, debug)
    }

    fn boot_times(rows: &[String]) -> Vec<i64> {
        rows.iter()
            .map(|r| r.split(',').nth(1).unwrap().parse().unwrap())
            .collect()
    }

    #[test]
    fn test_append_while_idle_is_noop() {
        let (writer, logs, _) = memory_writer();
        writer.append(&packet(SourceId::Umb, 1));
        assert_eq!(writer.pending(SourceId::Umb), 0);
        assert!(logs.rows.lock().unwrap().is_empty());
    }

    #[test]
    fn test_start_writes_header_once_per_source() {
        let (writer, logs, _) = memory_writer();
        assert!(writer.start(&[SourceId::Umb, SourceId::Tlm]));

        assert_eq!(logs.rows_for(SourceId::Umb), vec![row::header()]);
        assert_eq!(logs.rows_for(SourceId::Tlm), vec![row::header()]);
    }

    #[test]
    fn test_start_while_active_is_rejected() {
        let (writer, logs, _) = memory_writer();
        assert!(writer.start(&[SourceId::Umb]));
        assert!(!writer.start(&[SourceId::Umb, SourceId::Tlm]));

        assert_eq!(writer.logging_sources(), vec![SourceId::Umb]);
        assert_eq!(logs.rows_for(SourceId::Umb).len(), 1);
    }

    #[test]
    fn test_stop_while_idle_is_rejected() {
        let (writer, _, _) = memory_writer();
        assert!(!writer.stop());
    }

    #[test]
    fn test_append_for_unlogged_source_is_noop() {
        let (writer, logs, _) = memory_writer();
        writer.start(&[SourceId::Umb]);
        writer.append(&packet(SourceId::Tlm, 1));

        assert_eq!(writer.pending(SourceId::Tlm), 0);
        assert!(logs.rows_for(SourceId::Tlm).is_empty());
    }

    #[test]
    fn test_round_trip_below_capacity() {
        let (writer, logs, _) = memory_writer();
        writer.start(&[SourceId::Umb]);
        for i in 0..42 {
            writer.append(&packet(SourceId::Umb, i));
        }
        // Nothing written until stop
        assert_eq!(logs.rows_for(SourceId::Umb).len(), 1);
        assert_eq!(writer.pending(SourceId::Umb), 42);

        assert!(writer.stop());
        let rows = logs.rows_for(SourceId::Umb);
        assert_eq!(rows.len(), 43);
        assert_eq!(rows[0], row::header());
        assert_eq!(boot_times(&rows[1..]), (0..42).collect::<Vec<_>>());
        assert_eq!(*logs.closed.lock().unwrap(), vec![SourceId::Umb]);
        assert!(!writer.is_active());
    }

    #[test]
    fn test_capacity_triggers_immediate_flush() {
        let (writer, logs, _) = memory_writer();
        writer.start(&[SourceId::Tlm]);

        for i in 0..99 {
            writer.append(&packet(SourceId::Tlm, i));
        }
        assert_eq!(writer.pending(SourceId::Tlm), 99);

        writer.append(&packet(SourceId::Tlm, 99));
        assert_eq!(writer.pending(SourceId::Tlm), 0);
        assert_eq!(logs.rows_for(SourceId::Tlm).len(), 101);

        writer.append(&packet(SourceId::Tlm, 100));
        assert_eq!(writer.pending(SourceId::Tlm), 1);
    }

    #[test]
    fn test_timer_flush_writes_partial_buffers() {
        let (writer, logs, _) = memory_writer();
        writer.start(&[SourceId::Umb, SourceId::Tlm]);
        writer.append(&packet(SourceId::Umb, 1));
        writer.append(&packet(SourceId::Umb, 2));

        writer.flush_pending();
        assert_eq!(writer.pending(SourceId::Umb), 0);
        assert_eq!(boot_times(&logs.rows_for(SourceId::Umb)[1..]), vec![1, 2]);
        assert_eq!(logs.rows_for(SourceId::Tlm).len(), 1);
    }

    #[test]
    fn test_failed_flush_retains_rows_for_retry() {
        let (writer, logs, debug) = memory_writer();
        writer.start(&[SourceId::Umb]);
        writer.append(&packet(SourceId::Umb, 1));
        writer.append(&packet(SourceId::Umb, 2));

        logs.set_fail_writes(true);
        writer.flush_pending();
        assert_eq!(writer.pending(SourceId::Umb), 2);
        assert!(debug.contains("[LOG] UMB write failed, 2 rows kept for retry"));

        logs.set_fail_writes(false);
        writer.append(&packet(SourceId::Umb, 3));
        writer.flush_pending();
        assert_eq!(writer.pending(SourceId::Umb), 0);
        assert_eq!(
            boot_times(&logs.rows_for(SourceId::Umb)[1..]),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_stop_with_failing_sink_still_goes_idle() {
        let (writer, logs, debug) = memory_writer();
        writer.start(&[SourceId::Umb]);
        writer.append(&packet(SourceId::Umb, 1));

        logs.set_fail_writes(true);
        assert!(writer.stop());
        assert!(!writer.is_active());
        assert!(debug.contains("[LOG] UMB rows lost at stop: 1"));
        assert!(writer.logging_sources().is_empty());
    }

    #[test]
    fn test_unopenable_source_is_skipped() {
        let (writer, logs, debug) = memory_writer();
        *logs.fail_open.lock().unwrap() = Some(SourceId::Tlm);

        assert!(writer.start(&[SourceId::Umb, SourceId::Tlm]));
        assert_eq!(writer.logging_sources(), vec![SourceId::Umb]);
        assert!(debug.contains("[LOG] TLM log could not be opened"));
    }

    #[test]
    fn test_start_fails_when_nothing_opens() {
        let (writer, logs, _) = memory_writer();
        *logs.fail_open.lock().unwrap() = Some(SourceId::Umb);

        assert!(!writer.start(&[SourceId::Umb]));
        assert!(!writer.is_active());
        assert!(!writer.start(&[]));
    }

    #[test]
    fn test_csv_session_on_disk() {
        let tmp = TempDir::new().unwrap();
        let debug = Arc::new(DebugLog::default());
        let writer = LogWriter::to_directory(tmp.path(), DEFAULT_BUFFER_CAPACITY, debug);

        assert!(writer.start(&[SourceId::Umb]));
        for i in 0..5 {
            writer.append(&packet(SourceId::Umb, i));
        }
        assert!(writer.stop());

        let entries: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(entries.len(), 1);
        let name = entries[0].file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.ends_with("_UMB.csv"));

        let contents = std::fs::read_to_string(&entries[0]).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], row::header());
    }

    #[test]
    fn test_append_does_not_wait_on_other_link() {
        let (writer, logs, _) = memory_writer();
        let writer = Arc::new(writer);
        writer.start(&[SourceId::Umb, SourceId::Tlm]);

        // Stand-in for a UMB flush stuck in disk I/O
        let umb_busy = lock(&writer.logs[SourceId::Umb]);

        let (done_tx, done_rx) = std::sync::mpsc::channel();
        let tlm_writer = Arc::clone(&writer);
        let handle = std::thread::spawn(move || {
            // The last append reaches capacity and flushes TLM
            for i in 0..DEFAULT_BUFFER_CAPACITY as i64 {
                tlm_writer.append(&packet(SourceId::Tlm, i));
            }
            done_tx.send(()).unwrap();
        });

        let finished = done_rx.recv_timeout(Duration::from_secs(2));
        drop(umb_busy);
        handle.join().unwrap();

        assert!(finished.is_ok(), "TLM append blocked behind UMB");
        assert_eq!(logs.rows_for(SourceId::Tlm).len(), DEFAULT_BUFFER_CAPACITY + 1);
    }
}
