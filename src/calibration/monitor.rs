// Live calibration preview
//
// Unlike a recording session the monitor applies the candidate offset fresh
// on every tick and does not smooth, so slider changes show up immediately.

use serde::Serialize;

use super::store::CalibrationStore;
use super::{UI_MAX_OFFSET, UI_MIN_OFFSET};
use crate::config::CalibrationConfig;
use crate::error::{log_calibration_error, CalibrationError};
use crate::meter::{raw_db, rms, TickAccumulator};

/// Floor for preview readings; quieter input reads as this value
pub const PREVIEW_FLOOR_DB: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalibrationPreview {
    /// Rounded reading with the candidate offset applied
    pub decibels: f64,
    /// Offset in effect for this reading
    pub offset: i32,
    /// Whether the reading sits inside the quiet-room target band
    pub in_quiet_band: bool,
}

pub struct CalibrationMonitor {
    candidate: i32,
    quiet_min: f64,
    quiet_max: f64,
    accumulator: Option<TickAccumulator>,
}

impl CalibrationMonitor {
    /// Monitor driven one tick per frame
    pub fn new(config: &CalibrationConfig, initial_offset: i32) -> Self {
        Self {
            candidate: initial_offset.clamp(UI_MIN_OFFSET, UI_MAX_OFFSET),
            quiet_min: config.quiet_target_min_db,
            quiet_max: config.quiet_target_max_db,
            accumulator: None,
        }
    }

    /// Monitor driven by the sample clock
    pub fn with_sample_rate(
        config: &CalibrationConfig,
        initial_offset: i32,
        sample_rate: u32,
        tick_ms: u64,
    ) -> Self {
        let mut monitor = Self::new(config, initial_offset);
        monitor.accumulator = Some(TickAccumulator::new(sample_rate, tick_ms));
        monitor
    }

    pub fn candidate(&self) -> i32 {
        self.candidate
    }

    /// Move the candidate offset, limited to the slider range
    ///
    /// Returns the offset actually applied.
    pub fn set_candidate(&mut self, offset: i32) -> i32 {
        self.candidate = offset.clamp(UI_MIN_OFFSET, UI_MAX_OFFSET);
        self.candidate
    }

    pub fn preview_frame(&self, frame: &[f32]) -> CalibrationPreview {
        self.preview_level(rms(frame))
    }

    /// Feed raw samples; one preview per elapsed tick
    ///
    /// Falls back to one preview per call when built without a sample rate.
    pub fn push_samples(&mut self, samples: &[f32], mut on_preview: impl FnMut(CalibrationPreview)) {
        match self.accumulator.take() {
            Some(mut accumulator) => {
                accumulator.push(samples, |level| on_preview(self.preview_level(level)));
                self.accumulator = Some(accumulator);
            }
            None => on_preview(self.preview_frame(samples)),
        }
    }

    fn preview_level(&self, level: f64) -> CalibrationPreview {
        let db = raw_db(level, self.candidate as f64, PREVIEW_FLOOR_DB)
            .max(PREVIEW_FLOOR_DB)
            .round();
        CalibrationPreview {
            decibels: db,
            offset: self.candidate,
            in_quiet_band: db >= self.quiet_min && db <= self.quiet_max,
        }
    }

    /// Persist the candidate offset
    pub fn save(&self, store: &dyn CalibrationStore) -> Result<i32, CalibrationError> {
        store.set(self.candidate).inspect_err(|err| {
            log_calibration_error(err, "save_calibration");
        })?;
        Ok(self.candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::MemoryCalibrationStore;

    fn monitor(offset: i32) -> CalibrationMonitor {
        CalibrationMonitor::new(&CalibrationConfig::default(), offset)
    }

    #[test]
    fn test_silence_reads_preview_floor() {
        let preview = monitor(90).preview_frame(&[0.0; 256]);
        assert_eq!(preview.decibels, 30.0);
        assert!(preview.in_quiet_band);
    }

    #[test]
    fn test_offset_applies_without_smoothing() {
        // rms 0.01 -> -40 dBFS
        let frame = [0.01f32; 256];
        let mut monitor = monitor(90);
        assert_eq!(monitor.preview_frame(&frame).decibels, 50.0);

        monitor.set_candidate(72);
        let preview = monitor.preview_frame(&frame);
        assert_eq!(preview.decibels, 32.0);
        assert!(preview.in_quiet_band);
    }

    #[test]
    fn test_no_upper_clamp_in_preview() {
        let preview = monitor(150).preview_frame(&[1.0; 64]);
        assert_eq!(preview.decibels, 150.0);
        assert!(!preview.in_quiet_band);
    }

    #[test]
    fn test_candidate_limited_to_slider_range() {
        let mut monitor = monitor(20);
        assert_eq!(monitor.candidate(), UI_MIN_OFFSET);
        assert_eq!(monitor.set_candidate(400), UI_MAX_OFFSET);
    }

    #[test]
    fn test_sample_clock_emits_per_tick() {
        let mut monitor =
            CalibrationMonitor::with_sample_rate(&CalibrationConfig::default(), 90, 1000, 100);
        let mut previews = Vec::new();
        monitor.push_samples(&[0.0; 250], |p| previews.push(p));
        assert_eq!(previews.len(), 2);
    }

    #[test]
    fn test_save_writes_store() {
        let store = MemoryCalibrationStore::new();
        let mut monitor = monitor(90);
        monitor.set_candidate(84);

        assert_eq!(monitor.save(&store).unwrap(), 84);
        assert_eq!(store.get(), 84);
    }
}
