// Error types for the noise measurement core
//
// This module defines custom error types for audio capture, calibration,
// measurement validation, geolocation and submission, each carrying a stable
// numeric code and a user-facing message.

mod audio;
mod calibration;
mod measurement;
mod submission;

pub use audio::{log_audio_error, AudioError, AudioErrorCodes};
pub use calibration::{log_calibration_error, CalibrationError, CalibrationErrorCodes};
pub use measurement::{log_measurement_error, MeasurementError, MeasurementErrorCodes};
pub use submission::{GeolocationError, GeolocationErrorCodes, SubmissionError, SubmissionErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, so the CLI, the HTTP layer and the submission
/// flow all report failures the same way.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
