// Capture abstraction - the seam between sessions and audio hardware
//
// A session asks an `AudioCapture` for a stream, drains whatever frames the
// device has produced since the previous call, and drops the stream when it
// is done. Dropping a stream releases the device on every exit path.

use crate::error::AudioError;

/// Processing the platform must NOT apply to captured audio
///
/// Metering needs the raw signal; every field defaults to `false` so that
/// echo cancellation, noise suppression and automatic gain control stay off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CaptureConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

impl CaptureConstraints {
    /// Constraints used for every measurement
    pub const RAW: Self = Self {
        echo_cancellation: false,
        noise_suppression: false,
        auto_gain_control: false,
    };

    pub fn is_raw(&self) -> bool {
        *self == Self::RAW
    }
}

/// Whether a stream can keep producing frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    /// More frames may arrive
    Active,
    /// The source is exhausted (finite sources only)
    Ended,
}

/// Source of microphone streams
pub trait AudioCapture: Send + Sync {
    /// Acquire exclusive access to the input device
    ///
    /// # Errors
    /// `PermissionDenied` when the user or OS refuses access,
    /// `DeviceUnavailable` when no input device exists, or
    /// `StreamOpenFailed` for any other platform failure.
    fn acquire(&self, constraints: &CaptureConstraints)
        -> Result<Box<dyn CaptureStream>, AudioError>;

    /// Human-readable backend name for logs
    fn name(&self) -> &'static str;
}

/// An open input stream; dropping it releases the device
pub trait CaptureStream {
    /// Sample rate of delivered frames in Hz
    fn sample_rate(&self) -> u32;

    /// Hand every frame captured since the last call to `sink`, in order
    ///
    /// # Errors
    /// `StreamRevoked` when the device or permission went away mid-stream,
    /// `StreamFailure` for other mid-stream errors.
    fn read_available(&mut self, sink: &mut dyn FnMut(&[f32]))
        -> Result<StreamStatus, AudioError>;
}
