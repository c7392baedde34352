// Scripted capture backend for tests and headless runs
//
// Plays back pre-built blocks instead of touching hardware. Every acquire and
// release is counted so callers can assert that a device was released exactly
// once whatever way the session ended.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::capture::{AudioCapture, CaptureConstraints, CaptureStream, StreamStatus};
use crate::error::AudioError;

/// Acquire/release bookkeeping shared between a capture and its streams
#[derive(Debug, Default)]
pub struct DeviceCounters {
    acquired: AtomicUsize,
    released: AtomicUsize,
}

impl DeviceCounters {
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Streams currently holding the device
    pub fn active(&self) -> usize {
        self.acquired().saturating_sub(self.released())
    }
}

pub struct ScriptedCapture {
    sample_rate: u32,
    blocks: Arc<Vec<Vec<f32>>>,
    blocks_per_read: usize,
    revoke_after_reads: Option<usize>,
    denial: Option<AudioError>,
    last_constraints: std::sync::Mutex<Option<CaptureConstraints>>,
    counters: Arc<DeviceCounters>,
}

impl ScriptedCapture {
    pub fn from_blocks(sample_rate: u32, blocks: Vec<Vec<f32>>) -> Self {
        Self {
            sample_rate,
            blocks: Arc::new(blocks),
            blocks_per_read: 1,
            revoke_after_reads: None,
            denial: None,
            last_constraints: std::sync::Mutex::new(None),
            counters: Arc::new(DeviceCounters::default()),
        }
    }

    /// Blocks of a constant level; the RMS of every block equals `amplitude`
    pub fn constant(amplitude: f32, sample_rate: u32, block_size: usize, blocks: usize) -> Self {
        Self::from_blocks(sample_rate, vec![vec![amplitude; block_size]; blocks])
    }

    pub fn silence(sample_rate: u32, block_size: usize, blocks: usize) -> Self {
        Self::constant(0.0, sample_rate, block_size, blocks)
    }

    /// Uniform white noise in `[-amplitude, amplitude]`, reproducible from `seed`
    pub fn noise(
        amplitude: f32,
        sample_rate: u32,
        block_size: usize,
        blocks: usize,
        seed: u64,
    ) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let amplitude = amplitude.abs().max(f32::MIN_POSITIVE);
        let blocks = (0..blocks)
            .map(|_| {
                (0..block_size)
                    .map(|_| rng.gen_range(-amplitude..=amplitude))
                    .collect()
            })
            .collect();
        Self::from_blocks(sample_rate, blocks)
    }

    /// Deliver `n` blocks per `read_available` call
    pub fn with_blocks_per_read(mut self, n: usize) -> Self {
        self.blocks_per_read = n.max(1);
        self
    }

    /// Fail with `StreamRevoked` once `reads` reads have succeeded
    pub fn revoke_after_reads(mut self, reads: usize) -> Self {
        self.revoke_after_reads = Some(reads);
        self
    }

    /// Refuse every acquisition with `error`
    pub fn deny(mut self, error: AudioError) -> Self {
        self.denial = Some(error);
        self
    }

    pub fn counters(&self) -> Arc<DeviceCounters> {
        Arc::clone(&self.counters)
    }

    /// Constraints passed to the most recent `acquire`
    pub fn last_constraints(&self) -> Option<CaptureConstraints> {
        self.last_constraints.lock().ok().and_then(|guard| *guard)
    }
}

impl AudioCapture for ScriptedCapture {
    fn acquire(
        &self,
        constraints: &CaptureConstraints,
    ) -> Result<Box<dyn CaptureStream>, AudioError> {
        if let Ok(mut last) = self.last_constraints.lock() {
            *last = Some(*constraints);
        }
        if let Some(error) = &self.denial {
            return Err(error.clone());
        }

        self.counters.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedStream {
            sample_rate: self.sample_rate,
            blocks: Arc::clone(&self.blocks),
            position: 0,
            blocks_per_read: self.blocks_per_read,
            reads: 0,
            revoke_after_reads: self.revoke_after_reads,
            counters: Arc::clone(&self.counters),
        }))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

struct ScriptedStream {
    sample_rate: u32,
    blocks: Arc<Vec<Vec<f32>>>,
    position: usize,
    blocks_per_read: usize,
    reads: usize,
    revoke_after_reads: Option<usize>,
    counters: Arc<DeviceCounters>,
}

impl CaptureStream for ScriptedStream {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn read_available(
        &mut self,
        sink: &mut dyn FnMut(&[f32]),
    ) -> Result<StreamStatus, AudioError> {
        if self.revoke_after_reads.is_some_and(|limit| self.reads >= limit) {
            return Err(AudioError::StreamRevoked);
        }
        self.reads += 1;

        let end = (self.position + self.blocks_per_read).min(self.blocks.len());
        for block in &self.blocks[self.position..end] {
            sink(block);
        }
        self.position = end;

        if self.position >= self.blocks.len() {
            Ok(StreamStatus::Ended)
        } else {
            Ok(StreamStatus::Active)
        }
    }
}

impl Drop for ScriptedStream {
    fn drop(&mut self) {
        self.counters.released.fetch_add(1, Ordering::SeqCst);
    }
}
