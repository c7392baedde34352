// Calibration module - microphone offset persistence and live preview
//
// This module provides two main components:
// 1. CalibrationStore: Durable storage of the single decibel offset
// 2. CalibrationMonitor: Unsmoothed live reading used while tuning the offset
//
// The calibration workflow:
// 1. Start a monitor with the stored offset
// 2. Adjust the candidate offset until a quiet room reads 30-35 dB
// 3. Save, which persists the offset before returning

pub mod monitor;
pub mod store;

pub use monitor::{CalibrationMonitor, CalibrationPreview};
pub use store::{CalibrationStore, FileCalibrationStore, MemoryCalibrationStore};

/// Offset used when none has been saved
pub const DEFAULT_OFFSET: i32 = 90;

/// Slider bounds offered by calibration UIs; the store itself accepts any value
pub const UI_MIN_OFFSET: i32 = 50;
pub const UI_MAX_OFFSET: i32 = 150;

/// Key under which the offset is persisted
pub const STORE_KEY: &str = "mic_calibration_offset";
