// Audio capture error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Audio error code constants
///
/// Single source of truth for the numeric codes reported by the CLI and
/// the submission flow.
///
/// Error code range: 1001-1009
pub struct AudioErrorCodes {}

impl AudioErrorCodes {
    /// A recording session is already active on this controller
    pub const ALREADY_RECORDING: i32 = 1001;

    /// No recording session is active
    pub const NOT_RECORDING: i32 = 1002;

    /// No capture device present
    pub const DEVICE_UNAVAILABLE: i32 = 1003;

    /// Hardware error occurred
    pub const HARDWARE_ERROR: i32 = 1004;

    /// Microphone permission denied
    pub const PERMISSION_DENIED: i32 = 1005;

    /// Failed to open audio stream
    pub const STREAM_OPEN_FAILED: i32 = 1006;

    /// Device delivers a sample format the meter cannot read
    pub const UNSUPPORTED_FORMAT: i32 = 1007;

    /// Capture permission or device was revoked mid-stream
    pub const STREAM_REVOKED: i32 = 1008;

    /// Audio stream disconnected or channel closed unexpectedly
    pub const STREAM_FAILURE: i32 = 1009;
}

/// Log an audio error with structured context
///
/// This function logs audio errors with structured fields including:
/// - error_code: Numeric error code for programmatic handling
/// - component: The component where the error occurred
/// - message: Human-readable error message
/// - context: Additional contextual information
pub fn log_audio_error(err: &AudioError, context: &str) {
    error!(
        "Audio error in {}: code={}, component=AudioCapture, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Audio-related errors
///
/// These errors cover capture acquisition, stream lifetime and session
/// orchestration. All of them are recoverable: the caller reports the
/// message and may start a new session.
///
/// Error code range: 1001-1009
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// A recording session is already active on this controller
    AlreadyRecording,

    /// No recording session is active
    NotRecording,

    /// No capture device present
    DeviceUnavailable,

    /// Hardware error occurred
    HardwareError { details: String },

    /// Microphone permission denied
    PermissionDenied,

    /// Failed to open audio stream
    StreamOpenFailed { reason: String },

    /// Device delivers a sample format the meter cannot read
    UnsupportedFormat { format: String },

    /// Capture permission or device was revoked mid-stream
    StreamRevoked,

    /// Stream channel disconnected unexpectedly
    StreamFailure { reason: String },
}

impl AudioError {
    /// Whether this failure means the user has to grant access or plug in a device
    pub fn is_device_access(&self) -> bool {
        matches!(
            self,
            AudioError::PermissionDenied
                | AudioError::DeviceUnavailable
                | AudioError::StreamOpenFailed { .. }
                | AudioError::StreamRevoked
        )
    }
}

impl ErrorCode for AudioError {
    fn code(&self) -> i32 {
        match self {
            AudioError::AlreadyRecording => AudioErrorCodes::ALREADY_RECORDING,
            AudioError::NotRecording => AudioErrorCodes::NOT_RECORDING,
            AudioError::DeviceUnavailable => AudioErrorCodes::DEVICE_UNAVAILABLE,
            AudioError::HardwareError { .. } => AudioErrorCodes::HARDWARE_ERROR,
            AudioError::PermissionDenied => AudioErrorCodes::PERMISSION_DENIED,
            AudioError::StreamOpenFailed { .. } => AudioErrorCodes::STREAM_OPEN_FAILED,
            AudioError::UnsupportedFormat { .. } => AudioErrorCodes::UNSUPPORTED_FORMAT,
            AudioError::StreamRevoked => AudioErrorCodes::STREAM_REVOKED,
            AudioError::StreamFailure { .. } => AudioErrorCodes::STREAM_FAILURE,
        }
    }

    fn message(&self) -> String {
        match self {
            AudioError::AlreadyRecording => {
                "A recording is already in progress. Cancel it first.".to_string()
            }
            AudioError::NotRecording => "No recording in progress.".to_string(),
            AudioError::DeviceUnavailable => {
                "No microphone found. Connect a microphone and try again.".to_string()
            }
            AudioError::HardwareError { details } => {
                format!("Hardware error: {}", details)
            }
            AudioError::PermissionDenied => {
                "Microphone permission denied. Please grant microphone access.".to_string()
            }
            AudioError::StreamOpenFailed { reason } => {
                format!("Failed to open audio stream: {}", reason)
            }
            AudioError::UnsupportedFormat { format } => {
                format!("Unsupported sample format: {}", format)
            }
            AudioError::StreamRevoked => {
                "Microphone access was revoked during the recording.".to_string()
            }
            AudioError::StreamFailure { reason } => {
                format!("Audio stream failed: {}", reason)
            }
        }
    }
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AudioError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AudioError {}

impl From<std::io::Error> for AudioError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => AudioError::PermissionDenied,
            std::io::ErrorKind::NotFound => AudioError::DeviceUnavailable,
            _ => AudioError::HardwareError {
                details: err.to_string(),
            },
        }
    }
}
