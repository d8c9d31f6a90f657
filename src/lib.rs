// src/lib.rs
//! GPS Badge Library
//!
//! Reads NMEA sentences from a serial GPS module, keeps the latest fix and
//! draws it on a small e-ink badge.

pub mod config;
pub mod display;
pub mod error;
pub mod gps;
pub mod monitor;
pub mod schedule;

// Re-export main types for convenience
pub use display::FixDisplay;
pub use error::{GpsError, Result};
pub use gps::{Fix, PmtkCommand, Sentence, SentenceError};
pub use monitor::{GpsMonitor, MonitorOptions};
