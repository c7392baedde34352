// Measurement validation error types and constants

use crate::error::ErrorCode;
use log::warn;
use std::fmt;

/// Measurement error code constants
///
/// Error code range: 3001-3007
pub struct MeasurementErrorCodes {}

impl MeasurementErrorCodes {
    pub const MISSING_FIELD: i32 = 3001;
    pub const OUT_OF_BOUNDS: i32 = 3002;
    pub const OUTSIDE_SERVICE_AREA: i32 = 3003;
    pub const INVALID_ANNOYANCE: i32 = 3004;
    pub const UNKNOWN_SOURCE: i32 = 3005;
    pub const INVALID_COORDINATES: i32 = 3006;
    pub const STORAGE_FAILED: i32 = 3007;
}

/// Log a rejected measurement
///
/// Rejections are expected user input, so they are logged at warn level.
pub fn log_measurement_error(err: &MeasurementError, context: &str) {
    warn!(
        "Measurement rejected in {}: code={}, component=Validation, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Reasons a noise measurement is refused before or at submission
///
/// Error code range: 3001-3007
#[derive(Debug, Clone, PartialEq)]
pub enum MeasurementError {
    /// A required field is absent
    MissingField { field: &'static str },

    /// Decibel value outside the accepted sanity bounds
    OutOfBounds { value: f64, min: f64, max: f64 },

    /// Location outside the configured geofence
    OutsideServiceArea { latitude: f64, longitude: f64 },

    /// Annoyance level outside 1..=5
    InvalidAnnoyance { level: i64 },

    /// Source is not one of the known categories
    UnknownSource { source: String },

    /// Coordinates are not finite WGS84 values
    InvalidCoordinates { latitude: f64, longitude: f64 },

    /// The measurement store could not be read or written
    StorageFailed { reason: String },
}

impl MeasurementError {
    /// Short machine-oriented title used as the `error` field of API responses
    pub fn title(&self) -> &'static str {
        match self {
            MeasurementError::MissingField { .. } => "Missing required fields",
            MeasurementError::OutOfBounds { .. } => "Invalid noise value",
            MeasurementError::OutsideServiceArea { .. } => "Location out of bounds",
            MeasurementError::InvalidAnnoyance { .. } => "Invalid annoyance level",
            MeasurementError::UnknownSource { .. } => "Invalid noise source",
            MeasurementError::InvalidCoordinates { .. } => "Invalid coordinates",
            MeasurementError::StorageFailed { .. } => "Server Error",
        }
    }
}

impl ErrorCode for MeasurementError {
    fn code(&self) -> i32 {
        match self {
            MeasurementError::MissingField { .. } => MeasurementErrorCodes::MISSING_FIELD,
            MeasurementError::OutOfBounds { .. } => MeasurementErrorCodes::OUT_OF_BOUNDS,
            MeasurementError::OutsideServiceArea { .. } => {
                MeasurementErrorCodes::OUTSIDE_SERVICE_AREA
            }
            MeasurementError::InvalidAnnoyance { .. } => MeasurementErrorCodes::INVALID_ANNOYANCE,
            MeasurementError::UnknownSource { .. } => MeasurementErrorCodes::UNKNOWN_SOURCE,
            MeasurementError::InvalidCoordinates { .. } => {
                MeasurementErrorCodes::INVALID_COORDINATES
            }
            MeasurementError::StorageFailed { .. } => MeasurementErrorCodes::STORAGE_FAILED,
        }
    }

    fn message(&self) -> String {
        match self {
            MeasurementError::MissingField { field } => {
                format!("Missing required field: {}", field)
            }
            MeasurementError::OutOfBounds { value, min, max } => format!(
                "Noise value ({} dB) is out of bounds ({}-{} dB).",
                value, min, max
            ),
            MeasurementError::OutsideServiceArea {
                latitude,
                longitude,
            } => format!(
                "Recording location ({:.5}, {:.5}) is outside the service area.",
                latitude, longitude
            ),
            MeasurementError::InvalidAnnoyance { level } => {
                format!("Annoyance level must be between 1 and 5 (got {})", level)
            }
            MeasurementError::UnknownSource { source } => {
                format!("Unknown noise source: {}", source)
            }
            MeasurementError::InvalidCoordinates {
                latitude,
                longitude,
            } => format!("Invalid coordinates: {}, {}", latitude, longitude),
            MeasurementError::StorageFailed { reason } => {
                format!("Measurement storage failed: {}", reason)
            }
        }
    }
}

impl fmt::Display for MeasurementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MeasurementError::{} (code {}): {}",
            self.title(),
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for MeasurementError {}
