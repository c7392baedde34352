//! End-to-end recording sessions over scripted capture
//!
//! Covers the lifecycle the client drives: calibrate, record, reduce,
//! cancel, and device release on every exit path.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use noise_watch::audio::ScriptedCapture;
use noise_watch::calibration::{CalibrationStore, FileCalibrationStore, MemoryCalibrationStore};
use noise_watch::config::{MeterConfig, SessionConfig};
use noise_watch::error::AudioError;
use noise_watch::session::{SessionController, SessionState};

const RATE: u32 = 8000;
const TICK_SAMPLES: usize = 800;

#[test]
fn test_immediate_cancel_releases_device_once() {
    let capture = ScriptedCapture::silence(RATE, TICK_SAMPLES, 200);
    let counters = capture.counters();
    let mut session = SessionController::new(
        Arc::new(capture),
        Arc::new(MemoryCalibrationStore::new()),
        MeterConfig::default(),
        &SessionConfig::default(),
    );

    session.start().unwrap();
    assert_eq!(counters.active(), 1);
    assert!(session.cancel());

    assert_eq!(session.state(), SessionState::Cancelled);
    assert_eq!(counters.acquired(), 1);
    assert_eq!(counters.released(), 1);
    assert_eq!(counters.active(), 0);
    assert!(session.last_result().is_none());
}

#[test]
fn test_source_ending_before_first_tick_reduces_to_zero() {
    let capture = ScriptedCapture::from_blocks(RATE, Vec::new());
    let counters = capture.counters();
    let mut session = SessionController::new(
        Arc::new(capture),
        Arc::new(MemoryCalibrationStore::new()),
        MeterConfig::default(),
        &SessionConfig::default(),
    );

    session.start().unwrap();
    let result = session.pump().unwrap().expect("ended source completes the session");

    assert_eq!(result.average_decibels, 0.0);
    assert_eq!(result.reading_count, 0);
    assert!(result.readings.is_empty());
    assert_eq!(session.state(), SessionState::Completed);
    assert_eq!(counters.released(), 1);
    assert_eq!(counters.active(), 0);
}

#[test]
fn test_saved_offset_drives_the_next_session() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileCalibrationStore::new(dir.path().join("calibration.json")));
    store.set(100).unwrap();

    // -40 dBFS for 12 s
    let capture = ScriptedCapture::constant(0.01, RATE, TICK_SAMPLES, 120).with_blocks_per_read(40);
    let mut session =
        SessionController::new(Arc::new(capture), store, MeterConfig::default(), &SessionConfig::default());

    let cancel = Arc::new(AtomicBool::new(false));
    let result = session
        .record_blocking(Duration::from_millis(0), &cancel)
        .unwrap()
        .expect("session should complete");

    assert_eq!(result.calibration_offset, 100);
    assert_eq!(result.reading_count, 100);
    // Smoothing converges from the 40 dB baseline to 60 dB
    assert!(result.average_decibels > 55.0 && result.average_decibels <= 60.0);
    assert_eq!(result.readings.last().unwrap().decibels, 60.0);
}

#[test]
fn test_louder_input_gives_louder_average() {
    let run = |amplitude: f32| {
        let capture =
            ScriptedCapture::noise(amplitude, RATE, TICK_SAMPLES, 120, 11).with_blocks_per_read(120);
        let mut session = SessionController::new(
            Arc::new(capture),
            Arc::new(MemoryCalibrationStore::new()),
            MeterConfig::default(),
            &SessionConfig::default(),
        );
        session.start().unwrap();
        session.pump().unwrap().unwrap().average_decibels
    };

    let quiet = run(0.001);
    let loud = run(0.1);
    assert!(loud > quiet + 20.0, "quiet {quiet} loud {loud}");
}

#[test]
fn test_permission_denied_leaves_no_device_open() {
    let capture = ScriptedCapture::silence(RATE, TICK_SAMPLES, 10).deny(AudioError::PermissionDenied);
    let counters = capture.counters();
    let mut session = SessionController::new(
        Arc::new(capture),
        Arc::new(MemoryCalibrationStore::new()),
        MeterConfig::default(),
        &SessionConfig::default(),
    );

    let cancel = Arc::new(AtomicBool::new(false));
    assert_eq!(
        session.record_blocking(Duration::from_millis(0), &cancel),
        Err(AudioError::PermissionDenied)
    );
    assert_eq!(counters.active(), 0);
}
