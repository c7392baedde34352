//! Stateful loudness estimator producing one reading per tick.

use serde::{Deserialize, Serialize};

use super::{clamp_db, raw_db, rms, Smoother, TickAccumulator};
use crate::config::MeterConfig;

/// One smoothed loudness sample taken during a session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InstantReading {
    /// Time since the start of the measurement at the end of this tick
    pub timestamp_offset_ms: u64,
    /// Rounded, smoothed, calibrated level
    pub decibels: f64,
}

/// Converts audio into calibrated, smoothed decibel readings
///
/// The calibration offset is fixed when the estimator is built; sessions
/// build a fresh estimator from the offset they snapshot at start, so a
/// concurrent calibration save never changes a running measurement.
///
/// Two feeding modes exist:
/// - [`estimate_frame`](Self::estimate_frame): one tick per frame, for
///   timer-driven capture that snapshots a fixed-size analysis window.
/// - [`push_samples`](Self::push_samples): sample-clock driven; blocks of
///   any size are split into `tick_ms` windows using the sample rate.
#[derive(Debug, Clone)]
pub struct LoudnessEstimator {
    tick_ms: u64,
    floor_db: f64,
    ceiling_db: f64,
    baseline_db: f64,
    offset: i32,
    smoother: Smoother,
    ticks: u64,
    accumulator: Option<TickAccumulator>,
}

impl LoudnessEstimator {
    /// Estimator driven one frame per tick
    pub fn new(config: &MeterConfig, offset: i32) -> Self {
        Self {
            tick_ms: config.tick_ms,
            floor_db: config.floor_db,
            ceiling_db: config.ceiling_db,
            baseline_db: config.baseline_db,
            offset,
            smoother: Smoother::new(config.smoothing_alpha, config.baseline_db),
            ticks: 0,
            accumulator: None,
        }
    }

    /// Estimator whose ticks are derived from the sample clock
    pub fn with_sample_rate(config: &MeterConfig, offset: i32, sample_rate: u32) -> Self {
        let mut estimator = Self::new(config, offset);
        estimator.accumulator = Some(TickAccumulator::new(sample_rate, config.tick_ms));
        estimator
    }

    pub fn offset(&self) -> i32 {
        self.offset
    }

    /// Replace the offset used for subsequent ticks
    ///
    /// Only the live calibration preview uses this; recording sessions keep
    /// the offset they started with.
    pub fn set_offset(&mut self, offset: i32) {
        self.offset = offset;
    }

    pub fn tick_ms(&self) -> u64 {
        self.tick_ms
    }

    /// Number of readings produced so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Current unrounded smoothed level
    pub fn smoothed_db(&self) -> f64 {
        self.smoother.value()
    }

    /// Treat `frame` as one complete tick
    pub fn estimate_frame(&mut self, frame: &[f32]) -> InstantReading {
        self.tick(rms(frame))
    }

    /// Feed a capture block; `on_reading` fires once per completed tick
    ///
    /// Without a sample rate every call is a single tick.
    pub fn push_samples(&mut self, samples: &[f32], mut on_reading: impl FnMut(InstantReading)) {
        match self.accumulator.take() {
            Some(mut accumulator) => {
                accumulator.push(samples, |level| on_reading(self.tick(level)));
                self.accumulator = Some(accumulator);
            }
            None => on_reading(self.estimate_frame(samples)),
        }
    }

    /// Restart smoothing from the baseline and zero the tick counter
    pub fn reset(&mut self) {
        self.smoother.reset(self.baseline_db);
        self.ticks = 0;
        if let Some(accumulator) = self.accumulator.as_mut() {
            accumulator.reset();
        }
    }

    fn tick(&mut self, level: f64) -> InstantReading {
        let raw = raw_db(level, self.offset as f64, self.floor_db);
        let clamped = clamp_db(raw, self.floor_db, self.ceiling_db);
        let smoothed = self.smoother.update(clamped);

        self.ticks += 1;
        InstantReading {
            timestamp_offset_ms: self.ticks * self.tick_ms,
            decibels: smoothed.round(),
        }
    }
}
