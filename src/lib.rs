//! # GCS Telemetry Library
//!
//! Ground station telemetry core for the UMB (umbilical) and TLM (radio
//! telemetry) serial links.
//!
//! This library ingests CSV telemetry lines from both links, keeps a bounded
//! rolling history per link, measures arrival rates, records every accepted
//! packet to per-link CSV logs and mirrors the active link into a display
//! history polled by a presentation layer.

pub mod command;
pub mod config;
pub mod console;
pub mod coordinator;
pub mod debug;
pub mod display;
pub mod error;
pub mod history;
pub mod ingest;
pub mod recorder;
pub mod serial;
pub mod telemetry;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the guard if a previous holder panicked.
///
/// Every structure guarded in this crate stays valid between statements, so a
/// poisoned lock carries no torn state worth refusing.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
