//! Loudness metering: calibrated, smoothed decibel estimates from raw audio.
//!
//! The pipeline is a chain of pure steps
//! `frame -> rms -> raw dB -> clamped dB -> smoothed dB`, wrapped by
//! [`LoudnessEstimator`] which keeps the smoothing state and tick counter.
//! Nothing here allocates per frame, so the estimator can run directly on
//! the capture thread.

mod estimator;
mod tick;

pub use estimator::{InstantReading, LoudnessEstimator};
pub use tick::TickAccumulator;

/// Root-mean-square amplitude of a block of samples
///
/// An empty block has zero energy.
pub fn rms(frame: &[f32]) -> f64 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = frame.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_sq / frame.len() as f64).sqrt()
}

/// Convert an RMS amplitude to an offset-corrected decibel value, unclamped
///
/// Silence (and non-finite input) maps to `floor_db` rather than `-inf`.
pub fn raw_db(rms: f64, offset: f64, floor_db: f64) -> f64 {
    if rms > 0.0 && rms.is_finite() {
        20.0 * rms.log10() + offset
    } else {
        floor_db
    }
}

/// Clamp a decibel value into `[min, max]`
pub fn clamp_db(db: f64, min: f64, max: f64) -> f64 {
    if db.is_nan() {
        return min;
    }
    db.clamp(min, max)
}

/// One-pole exponential smoother
///
/// `value_t = alpha * value_{t-1} + (1 - alpha) * input_t`
#[derive(Debug, Clone)]
pub struct Smoother {
    alpha: f64,
    value: f64,
}

impl Smoother {
    pub fn new(alpha: f64, initial: f64) -> Self {
        Self {
            alpha,
            value: initial,
        }
    }

    pub fn update(&mut self, input: f64) -> f64 {
        self.value = self.alpha * self.value + (1.0 - self.alpha) * input;
        self.value
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn reset(&mut self, initial: f64) {
        self.value = initial;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rms_of_constant_amplitude() {
        let frame = vec![0.5_f32; 1024];
        assert!((rms(&frame) - 0.5).abs() < 1e-9);

        let square: Vec<f32> = (0..1024).map(|i| if i % 2 == 0 { 0.25 } else { -0.25 }).collect();
        assert!((rms(&square) - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_rms_of_empty_frame_is_zero() {
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn test_raw_db_silence_uses_floor() {
        assert_eq!(raw_db(0.0, 90.0, 10.0), 10.0);
        assert_eq!(raw_db(f64::NAN, 90.0, 10.0), 10.0);
    }

    #[test]
    fn test_raw_db_full_scale_equals_offset() {
        assert!((raw_db(1.0, 90.0, 10.0) - 90.0).abs() < 1e-12);
        assert!((raw_db(0.1, 90.0, 10.0) - 70.0).abs() < 1e-9);
    }

    #[test]
    fn test_offset_shift_is_exact_before_clamping() {
        let level = rms(&vec![0.0123_f32; 2048]);
        for o1 in [-20.0, 0.0, 70.0, 90.0, 100.0] {
            for k in [-15.0, 0.5, 3.0, 42.0] {
                let a = raw_db(level, o1, 10.0);
                let b = raw_db(level, o1 + k, 10.0);
                assert!(((b - a) - k).abs() < 1e-9, "o1={o1} k={k}");
            }
        }
    }

    #[test]
    fn test_clamp_is_monotonic_at_both_ends() {
        for below in [-1000.0, -1.0, 0.0, 9.999] {
            assert_eq!(clamp_db(below, 10.0, 130.0), 10.0);
        }
        for above in [130.001, 200.0, 1e9, f64::INFINITY] {
            assert_eq!(clamp_db(above, 10.0, 130.0), 130.0);
        }
        assert_eq!(clamp_db(64.0, 10.0, 130.0), 64.0);
    }

    #[test]
    fn test_smoother_converges() {
        let mut smoother = Smoother::new(0.8, 40.0);
        let mut last = 0.0;
        for _ in 0..200 {
            last = smoother.update(70.0);
        }
        assert!((last - 70.0).abs() < 1e-6);
    }

    #[test]
    fn test_smoother_zero_alpha_passes_through() {
        let mut smoother = Smoother::new(0.0, 40.0);
        assert_eq!(smoother.update(55.0), 55.0);
        assert_eq!(smoother.update(31.0), 31.0);
    }
}
