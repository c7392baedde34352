// Geolocation and submission error types

use crate::error::{AudioError, ErrorCode, MeasurementError};
use std::fmt;

/// Geolocation error code constants
///
/// Error code range: 4001-4003
pub struct GeolocationErrorCodes {}

impl GeolocationErrorCodes {
    pub const PERMISSION_DENIED: i32 = 4001;
    pub const POSITION_UNAVAILABLE: i32 = 4002;
    pub const TIMEOUT: i32 = 4003;
}

/// Failures reported by the geolocation collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeolocationError {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
}

impl GeolocationError {
    /// Map a platform error code (1 denied, 2 unavailable, 3 timeout)
    pub fn from_platform_code(code: u16) -> Self {
        match code {
            1 => GeolocationError::PermissionDenied,
            3 => GeolocationError::Timeout,
            _ => GeolocationError::PositionUnavailable,
        }
    }
}

impl ErrorCode for GeolocationError {
    fn code(&self) -> i32 {
        match self {
            GeolocationError::PermissionDenied => GeolocationErrorCodes::PERMISSION_DENIED,
            GeolocationError::PositionUnavailable => GeolocationErrorCodes::POSITION_UNAVAILABLE,
            GeolocationError::Timeout => GeolocationErrorCodes::TIMEOUT,
        }
    }

    fn message(&self) -> String {
        match self {
            GeolocationError::PermissionDenied => {
                "Location access was denied. Please enable GPS.".to_string()
            }
            GeolocationError::PositionUnavailable => "Location is not available.".to_string(),
            GeolocationError::Timeout => {
                "Getting your location is taking too long. Move to an open area.".to_string()
            }
        }
    }
}

impl fmt::Display for GeolocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GeolocationError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for GeolocationError {}

/// Submission error code constants
///
/// Error code range: 5001-5004
pub struct SubmissionErrorCodes {}

impl SubmissionErrorCodes {
    pub const DEVICE_ACCESS: i32 = 5001;
    pub const INVALID_MEASUREMENT: i32 = 5002;
    pub const NETWORK: i32 = 5003;
    pub const SERVER: i32 = 5004;
}

/// Everything that can stop a recorded measurement from reaching the API
///
/// Each variant carries the text shown to the user; no partial data is
/// sent for any of them.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionError {
    /// Microphone or location access failed
    DeviceAccess { message: String },

    /// Rejected locally or by the API's validation
    InvalidMeasurement { message: String },

    /// API unreachable
    Network { details: String },

    /// API answered with an unexpected status
    Server { status: u16, message: String },
}

impl From<AudioError> for SubmissionError {
    fn from(err: AudioError) -> Self {
        SubmissionError::DeviceAccess {
            message: err.message(),
        }
    }
}

impl From<GeolocationError> for SubmissionError {
    fn from(err: GeolocationError) -> Self {
        SubmissionError::DeviceAccess {
            message: err.message(),
        }
    }
}

impl From<MeasurementError> for SubmissionError {
    fn from(err: MeasurementError) -> Self {
        SubmissionError::InvalidMeasurement {
            message: err.message(),
        }
    }
}

impl ErrorCode for SubmissionError {
    fn code(&self) -> i32 {
        match self {
            SubmissionError::DeviceAccess { .. } => SubmissionErrorCodes::DEVICE_ACCESS,
            SubmissionError::InvalidMeasurement { .. } => SubmissionErrorCodes::INVALID_MEASUREMENT,
            SubmissionError::Network { .. } => SubmissionErrorCodes::NETWORK,
            SubmissionError::Server { .. } => SubmissionErrorCodes::SERVER,
        }
    }

    fn message(&self) -> String {
        match self {
            SubmissionError::DeviceAccess { message } => message.clone(),
            SubmissionError::InvalidMeasurement { message } => message.clone(),
            SubmissionError::Network { .. } => {
                "Could not connect to the server. Check your connection.".to_string()
            }
            SubmissionError::Server { status, message } => {
                format!("Server error ({}): {}", status, message)
            }
        }
    }
}

impl fmt::Display for SubmissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SubmissionError (code {}): {}",
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for SubmissionError {}
