// Calibration error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Calibration error code constants
///
/// Error code range: 2001-2004
pub struct CalibrationErrorCodes {}

impl CalibrationErrorCodes {
    /// Calibration file exists but could not be read
    pub const STORE_READ_FAILED: i32 = 2001;

    /// Calibration file could not be written
    pub const STORE_WRITE_FAILED: i32 = 2002;

    /// Calibration file content is not a valid key-value document
    pub const STORE_CORRUPT: i32 = 2003;

    /// Calibration state lock was poisoned
    pub const STATE_POISONED: i32 = 2004;
}

/// Log a calibration error with structured context
pub fn log_calibration_error(err: &CalibrationError, context: &str) {
    error!(
        "Calibration error in {}: code={}, component=CalibrationStore, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Calibration-related errors
///
/// These errors cover the durable offset store and the live calibration
/// preview.
///
/// Error code range: 2001-2004
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// Calibration file exists but could not be read
    StoreReadFailed { path: String, reason: String },

    /// Calibration file could not be written
    StoreWriteFailed { path: String, reason: String },

    /// Calibration file content is not a valid key-value document
    StoreCorrupt { reason: String },

    /// Calibration state lock was poisoned
    StatePoisoned,
}

impl ErrorCode for CalibrationError {
    fn code(&self) -> i32 {
        match self {
            CalibrationError::StoreReadFailed { .. } => CalibrationErrorCodes::STORE_READ_FAILED,
            CalibrationError::StoreWriteFailed { .. } => CalibrationErrorCodes::STORE_WRITE_FAILED,
            CalibrationError::StoreCorrupt { .. } => CalibrationErrorCodes::STORE_CORRUPT,
            CalibrationError::StatePoisoned => CalibrationErrorCodes::STATE_POISONED,
        }
    }

    fn message(&self) -> String {
        match self {
            CalibrationError::StoreReadFailed { path, reason } => {
                format!("Failed to read calibration from {}: {}", path, reason)
            }
            CalibrationError::StoreWriteFailed { path, reason } => {
                format!("Failed to save calibration to {}: {}", path, reason)
            }
            CalibrationError::StoreCorrupt { reason } => {
                format!("Calibration data is corrupt: {}", reason)
            }
            CalibrationError::StatePoisoned => "Calibration state lock poisoned".to_string(),
        }
    }
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CalibrationError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for CalibrationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calibration_error_codes() {
        assert_eq!(
            CalibrationError::StoreReadFailed {
                path: "a".to_string(),
                reason: "b".to_string()
            }
            .code(),
            2001
        );
        assert_eq!(
            CalibrationError::StoreCorrupt {
                reason: "x".to_string()
            }
            .code(),
            CalibrationErrorCodes::STORE_CORRUPT
        );
        assert_eq!(CalibrationError::StatePoisoned.code(), 2004);
    }

    #[test]
    fn test_calibration_error_display() {
        let err = CalibrationError::StoreWriteFailed {
            path: "/tmp/cal.json".to_string(),
            reason: "read-only file system".to_string(),
        };
        assert!(err.message().contains("/tmp/cal.json"));
        assert!(format!("{}", err).contains("code 2002"));
    }
}
