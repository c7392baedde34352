// FramePool - lock-free frame pool with dual SPSC queues
//
// Implements an object pool pattern using two lock-free SPSC (Single Producer Single Consumer)
// ring buffers between the device callback and the meter. The device callback never
// allocates, locks or blocks: it only copies samples into recycled buffers.
//
// Architecture:
// - DATA_QUEUE: Capture thread pushes filled buffers, meter side consumes
// - POOL_QUEUE: Meter side returns empty buffers, capture thread recycles
//
// Buffer flow:
// 1. Capture thread pops empty buffer from POOL_QUEUE
// 2. Capture thread copies (first-channel) samples into it
// 3. Capture thread pushes filled buffer to DATA_QUEUE
// 4. Meter side pops filled buffer from DATA_QUEUE and meters it
// 5. Meter side pushes the emptied buffer back to POOL_QUEUE

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rtrb::{Consumer, Producer};

/// Configuration constants for the frame pool
pub const DEFAULT_BUFFER_COUNT: usize = 16;
pub const DEFAULT_BUFFER_SIZE: usize = 2048;

/// Audio buffer type - pre-allocated vector of f32 samples
pub type AudioBuffer = Vec<f32>;

/// Capture-thread half of the pool
pub struct CaptureSide {
    data_producer: Producer<AudioBuffer>,
    pool_consumer: Consumer<AudioBuffer>,
    dropped: Arc<AtomicU64>,
}

/// Meter half of the pool
pub struct MeterSide {
    data_consumer: Consumer<AudioBuffer>,
    pool_producer: Producer<AudioBuffer>,
    dropped: Arc<AtomicU64>,
}

/// Lock-free frame pool using dual SPSC ring buffers
///
/// Pre-allocates a fixed number of buffers; all heap allocation happens in
/// [`FramePool::new`].
///
/// # Example
/// ```ignore
/// let (mut capture, mut meter) = FramePool::new(16, 2048);
///
/// // In the device callback:
/// capture.write_interleaved(data, channel_count);
///
/// // On the session thread:
/// meter.drain(|frame| estimator.push_samples(frame, |r| readings.push(r)));
/// ```
pub struct FramePool;

impl FramePool {
    /// Create a pool of `buffer_count` buffers holding `buffer_size` samples each
    ///
    /// # Panics
    /// Panics if buffer_count is 0 or buffer_size is 0
    #[allow(clippy::new_ret_no_self)]
    pub fn new(buffer_count: usize, buffer_size: usize) -> (CaptureSide, MeterSide) {
        assert!(buffer_count > 0, "buffer_count must be greater than 0");
        assert!(buffer_size > 0, "buffer_size must be greater than 0");

        let (mut pool_producer, pool_consumer) = rtrb::RingBuffer::new(buffer_count);
        let (data_producer, data_consumer) = rtrb::RingBuffer::new(buffer_count);

        for _ in 0..buffer_count {
            let buffer: AudioBuffer = Vec::with_capacity(buffer_size);
            pool_producer
                .push(buffer)
                .expect("Failed to push buffer to pool queue during initialization");
        }

        let dropped = Arc::new(AtomicU64::new(0));
        (
            CaptureSide {
                data_producer,
                pool_consumer,
                dropped: Arc::clone(&dropped),
            },
            MeterSide {
                data_consumer,
                pool_producer,
                dropped,
            },
        )
    }
}

impl CaptureSide {
    /// Copy the first channel of interleaved device data into pooled buffers
    ///
    /// Blocks larger than one buffer are split across several buffers.
    /// Samples are dropped (and counted) when the pool is exhausted.
    pub fn write_interleaved(&mut self, data: &[f32], channels: usize) {
        let channels = channels.max(1);
        let mut frames = data.chunks(channels).map(|frame| frame[0]).peekable();

        while frames.peek().is_some() {
            let Ok(mut buffer) = self.pool_consumer.pop() else {
                let remaining = frames.count() as u64;
                self.dropped.fetch_add(remaining, Ordering::Relaxed);
                return;
            };

            buffer.clear();
            let capacity = buffer.capacity();
            buffer.extend(frames.by_ref().take(capacity));

            if let Err(rtrb::PushError::Full(buffer)) = self.data_producer.push(buffer) {
                self.dropped.fetch_add(buffer.len() as u64, Ordering::Relaxed);
            }
        }
    }

    /// Copy mono samples into pooled buffers
    pub fn write_mono(&mut self, data: &[f32]) {
        self.write_interleaved(data, 1);
    }
}

impl MeterSide {
    /// Hand every filled buffer to `f` in capture order, then recycle it
    ///
    /// Returns the number of buffers drained.
    pub fn drain(&mut self, mut f: impl FnMut(&[f32])) -> usize {
        let mut drained = 0;
        while let Ok(mut buffer) = self.data_consumer.pop() {
            f(&buffer);
            buffer.clear();
            // Capacity equals the buffer count, so returning a buffer cannot fail
            let _ = self.pool_producer.push(buffer);
            drained += 1;
        }
        drained
    }

    /// Samples lost because the meter fell behind the device
    pub fn dropped_samples(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
