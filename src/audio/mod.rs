// Audio module - microphone capture backends and the lock-free frame pool

pub mod buffer_pool;
pub mod capture;
#[cfg(feature = "live_audio")]
pub mod cpal_capture;
pub mod scripted;
pub mod wav;

// Re-export commonly used types for convenience
pub use buffer_pool::{
    AudioBuffer, CaptureSide, FramePool, MeterSide, DEFAULT_BUFFER_COUNT, DEFAULT_BUFFER_SIZE,
};
pub use capture::{AudioCapture, CaptureConstraints, CaptureStream, StreamStatus};
#[cfg(feature = "live_audio")]
pub use cpal_capture::CpalCapture;
pub use scripted::{DeviceCounters, ScriptedCapture};
pub use wav::WavCapture;
