//! # Bounded History
//!
//! Fixed-capacity, drop-oldest record histories.
//!
//! [`HistoryManager`] keeps one history per link plus a display history fed
//! only by the active link. Each history sits behind its own mutex, so a
//! snapshot always observes a whole append and the two links never contend
//! with each other.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::lock;
use crate::telemetry::record::{PerSource, SourceId, TelemetryRecord};

/// Default number of records kept per history
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// Ordered sequence capped at `capacity` entries, evicting the oldest on overflow
#[derive(Debug, Clone)]
pub struct BoundedHistory<T> {
    entries: VecDeque<T>,
    capacity: usize,
    appended: u64,
}

impl<T> BoundedHistory<T> {
    /// Creates an empty history. A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            appended: 0,
        }
    }

    /// Appends `item`, returning the evicted oldest entry if the cap was hit
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(item);
        self.appended += 1;
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recently appended entry
    pub fn latest(&self) -> Option<&T> {
        self.entries.back()
    }

    /// Total appends since creation, including evicted entries
    pub fn appended(&self) -> u64 {
        self.appended
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }
}

impl<T: Clone> BoundedHistory<T> {
    /// Copies the entries, oldest first
    pub fn snapshot(&self) -> Vec<T> {
        self.entries.iter().cloned().collect()
    }
}

/// Display history contents together with its append counter
#[derive(Debug, Clone, Default)]
pub struct DisplayView {
    pub records: Vec<TelemetryRecord>,
    pub latest: Option<TelemetryRecord>,
    pub appended: u64,
}

/// Per-link and display histories
#[derive(Debug)]
pub struct HistoryManager {
    sources: PerSource<Mutex<BoundedHistory<TelemetryRecord>>>,
    display: Mutex<BoundedHistory<TelemetryRecord>>,
}

impl HistoryManager {
    pub fn new(capacity: usize) -> Self {
        Self {
            sources: PerSource::from_fn(|_| Mutex::new(BoundedHistory::new(capacity))),
            display: Mutex::new(BoundedHistory::new(capacity)),
        }
    }

    /// Appends to the history of `source`
    pub fn append(&self, source: SourceId, record: TelemetryRecord) {
        lock(&self.sources[source]).push(record);
    }

    /// Appends to the display history
    pub fn append_display(&self, record: TelemetryRecord) {
        lock(&self.display).push(record);
    }

    /// Display history, oldest first
    pub fn snapshot(&self) -> Vec<TelemetryRecord> {
        lock(&self.display).snapshot()
    }

    /// Display history with its latest entry and append counter, read under one lock
    pub fn display_view(&self) -> DisplayView {
        let display = lock(&self.display);
        DisplayView {
            records: display.snapshot(),
            latest: display.latest().cloned(),
            appended: display.appended(),
        }
    }

    /// Number of display appends so far
    pub fn display_appended(&self) -> u64 {
        lock(&self.display).appended()
    }

    /// History of `source`, oldest first
    pub fn source_snapshot(&self, source: SourceId) -> Vec<TelemetryRecord> {
        lock(&self.sources[source]).snapshot()
    }

    /// Last record received on `source`
    pub fn latest(&self, source: SourceId) -> Option<TelemetryRecord> {
        lock(&self.sources[source]).latest().cloned()
    }
}
