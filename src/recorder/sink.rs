//! # Log Sinks
//!
//! Where flushed log rows go. [`CsvDirectory`] opens one CSV file per link
//! per session, named `<YYYYmmdd_HHMMSS>_<SOURCE>.csv`.

use chrono::{DateTime, Local};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::telemetry::record::SourceId;

/// Append-only destination for rendered rows
pub trait RowSink: Send {
    /// Writes every row, each followed by a newline, and pushes them to storage
    ///
    /// On error nothing from `rows` may remain in the sink, so the caller can
    /// retry the same rows.
    fn write_rows(&mut self, rows: &[String]) -> io::Result<()>;

    /// Flushes and releases the sink
    fn close(&mut self) -> io::Result<()>;
}

/// Opens a fresh sink for one link at session start
pub trait SinkOpener: Send {
    fn open(&mut self, source: SourceId, started_at: &DateTime<Local>)
        -> io::Result<Box<dyn RowSink>>;
}

/// File name for a session log
pub fn log_file_name(source: SourceId, started_at: &DateTime<Local>) -> String {
    format!("{}_{}.csv", started_at.format("%Y%m%d_%H%M%S"), source)
}

/// CSV file sink
///
/// Each batch goes to the file in a single write. A failed batch is cut back
/// to the end of the last complete one.
#[derive(Debug)]
pub struct CsvFileSink {
    file: File,
    path: PathBuf,
    committed: u64,
}

impl CsvFileSink {
    fn new(file: File, path: PathBuf) -> Self {
        Self {
            file,
            path,
            committed: 0,
        }
    }

    fn rollback(&mut self) {
        let committed = self.committed;
        let result = self
            .file
            .set_len(committed)
            .and_then(|()| self.file.seek(SeekFrom::Start(committed)));
        if let Err(e) = result {
            warn!("could not roll back {}: {}", self.path.display(), e);
        }
    }
}

impl RowSink for CsvFileSink {
    fn write_rows(&mut self, rows: &[String]) -> io::Result<()> {
        let mut batch = String::with_capacity(rows.iter().map(|r| r.len() + 1).sum());
        for row in rows {
            batch.push_str(row);
            batch.push('\n');
        }

        if let Err(e) = self.file.write_all(batch.as_bytes()) {
            self.rollback();
            return Err(e);
        }
        self.committed += batch.len() as u64;
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.file.sync_all()?;
        debug!("closed log file {}", self.path.display());
        Ok(())
    }
}

/// Opens CSV logs inside a directory, creating it on demand
#[derive(Debug, Clone)]
pub struct CsvDirectory {
    dir: PathBuf,
}

impl CsvDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Creates a new file, never truncating an earlier session's log
    fn create(&self, name: &str) -> io::Result<(File, PathBuf)> {
        let stem = name.trim_end_matches(".csv");
        for attempt in 0..100 {
            let path = if attempt == 0 {
                self.dir.join(name)
            } else {
                self.dir.join(format!("{}_{}.csv", stem, attempt))
            };
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((file, path)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            }
        }
        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free log file name for {}", name),
        ))
    }
}

impl SinkOpener for CsvDirectory {
    fn open(
        &mut self,
        source: SourceId,
        started_at: &DateTime<Local>,
    ) -> io::Result<Box<dyn RowSink>> {
        fs::create_dir_all(&self.dir)?;
        let (file, path) = self.create(&log_file_name(source, started_at))?;
        debug!("[{}] opened log file {}", source, path.display());
        Ok(Box::new(CsvFileSink::new(file, path)))
    }
}

#[cfg(test)]
pub(crate) mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Rows written per source, shared with the test
    #[derive(Clone, Default)]
    pub struct MemoryLogs {
        pub rows: Arc<Mutex<Vec<(SourceId, String)>>>,
        pub fail_writes: Arc<Mutex<bool>>,
        pub fail_open: Arc<Mutex<Option<SourceId>>>,
        pub closed: Arc<Mutex<Vec<SourceId>>>,
    }

    impl MemoryLogs {
        pub fn rows_for(&self, source: SourceId) -> Vec<String> {
            self.rows
                .lock()
                .unwrap()
                .iter()
                .filter(|(s, _)| *s == source)
                .map(|(_, row)| row.clone())
                .collect()
        }

        pub fn set_fail_writes(&self, fail: bool) {
            *self.fail_writes.lock().unwrap() = fail;
        }
    }

    struct MemorySink {
        source: SourceId,
        logs: MemoryLogs,
    }

    impl RowSink for MemorySink {
        fn write_rows(&mut self, rows: &[String]) -> io::Result<()> {
            if *self.logs.fail_writes.lock().unwrap() {
                return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
            }
            let mut all = self.logs.rows.lock().unwrap();
            all.extend(rows.iter().map(|r| (self.source, r.clone())));
            Ok(())
        }

        fn close(&mut self) -> io::Result<()> {
            self.logs.closed.lock().unwrap().push(self.source);
            Ok(())
        }
    }

    impl SinkOpener for MemoryLogs {
        fn open(
            &mut self,
            source: SourceId,
            _started_at: &DateTime<Local>,
        ) -> io::Result<Box<dyn RowSink>> {
            if *self.fail_open.lock().unwrap() == Some(source) {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
            }
            Ok(Box::new(MemorySink {
                source,
                logs: self.clone(),
            }))
        }
    }
}
