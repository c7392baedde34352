//! Splits an arbitrary-block-size sample stream into fixed tick windows.

/// Accumulates squared samples until a tick window is complete
///
/// Capture backends deliver blocks of whatever size the device chooses
/// (2048 or 4096 samples are common); this keeps a running sum so a tick
/// can end in the middle of a block without copying samples.
#[derive(Debug, Clone)]
pub struct TickAccumulator {
    samples_per_tick: usize,
    sum_sq: f64,
    count: usize,
}

impl TickAccumulator {
    /// Window of `tick_ms` milliseconds at `sample_rate`
    ///
    /// A window is always at least one sample long.
    pub fn new(sample_rate: u32, tick_ms: u64) -> Self {
        let samples_per_tick = ((sample_rate as u64 * tick_ms) / 1000).max(1) as usize;
        Self {
            samples_per_tick,
            sum_sq: 0.0,
            count: 0,
        }
    }

    pub fn samples_per_tick(&self) -> usize {
        self.samples_per_tick
    }

    /// Samples collected towards the current, unfinished window
    pub fn pending(&self) -> usize {
        self.count
    }

    /// Feed samples; `on_tick` receives the RMS of every completed window
    pub fn push(&mut self, samples: &[f32], mut on_tick: impl FnMut(f64)) {
        for &sample in samples {
            let s = sample as f64;
            self.sum_sq += s * s;
            self.count += 1;

            if self.count == self.samples_per_tick {
                on_tick((self.sum_sq / self.count as f64).sqrt());
                self.sum_sq = 0.0;
                self.count = 0;
            }
        }
    }

    pub fn reset(&mut self) {
        self.sum_sq = 0.0;
        self.count = 0;
    }
}
