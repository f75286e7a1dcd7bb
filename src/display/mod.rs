//! # Display Module
//!
//! Helpers for the presentation layer. Nothing here is core state: these are
//! pure functions of records and externally supplied calibration.
//!
//! This module handles:
//! - Affine calibration of analog and thermocouple channels
//! - Valve open/closed interpretation for indicators
//! - Status panel and rate label rendering

pub mod calibration;
pub mod status;
