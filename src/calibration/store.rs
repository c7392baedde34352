// Calibration store: the single persisted decibel offset
//
// The offset is read fresh by each session at start and only changes
// through an explicit `set`, which persists before returning.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use serde_json::Value;

use super::{DEFAULT_OFFSET, STORE_KEY};
use crate::error::{log_calibration_error, CalibrationError};

/// Durable key-value storage for the calibration offset
pub trait CalibrationStore: Send + Sync {
    /// Current offset, or the default when none was saved
    fn get(&self) -> i32;

    /// Overwrite the offset; durable once this returns `Ok`
    ///
    /// No range coercion happens here.
    fn set(&self, offset: i32) -> Result<(), CalibrationError>;
}

/// Process-local store for tests and ephemeral runs
#[derive(Debug)]
pub struct MemoryCalibrationStore {
    default_offset: i32,
    offset: RwLock<Option<i32>>,
}

impl MemoryCalibrationStore {
    pub fn new() -> Self {
        Self::with_default(DEFAULT_OFFSET)
    }

    pub fn with_default(default_offset: i32) -> Self {
        Self {
            default_offset,
            offset: RwLock::new(None),
        }
    }
}

impl Default for MemoryCalibrationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CalibrationStore for MemoryCalibrationStore {
    fn get(&self) -> i32 {
        match self.offset.read() {
            Ok(guard) => guard.unwrap_or(self.default_offset),
            Err(_) => {
                log_calibration_error(&CalibrationError::StatePoisoned, "get_offset");
                self.default_offset
            }
        }
    }

    fn set(&self, offset: i32) -> Result<(), CalibrationError> {
        let mut guard = self
            .offset
            .write()
            .map_err(|_| CalibrationError::StatePoisoned)?;
        *guard = Some(offset);
        Ok(())
    }
}

/// JSON key-value file store
///
/// The file is an object of string keys; only [`STORE_KEY`] is interpreted
/// and any other keys are preserved on write. Writes go to a sibling
/// temporary file that is then renamed over the original.
#[derive(Debug)]
pub struct FileCalibrationStore {
    path: PathBuf,
    default_offset: i32,
    write_lock: Mutex<()>,
}

impl FileCalibrationStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_default(path, DEFAULT_OFFSET)
    }

    pub fn with_default(path: impl Into<PathBuf>, default_offset: i32) -> Self {
        Self {
            path: path.into(),
            default_offset,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn path_string(&self) -> String {
        self.path.display().to_string()
    }

    fn read_entries(&self) -> Result<BTreeMap<String, Value>, CalibrationError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(BTreeMap::new())
            }
            Err(err) => {
                return Err(CalibrationError::StoreReadFailed {
                    path: self.path_string(),
                    reason: err.to_string(),
                })
            }
        };

        serde_json::from_str(&contents).map_err(|err| CalibrationError::StoreCorrupt {
            reason: format!("{}: {}", self.path_string(), err),
        })
    }

    /// Stored offset without falling back to the default
    ///
    /// `Ok(None)` when nothing has been saved yet.
    pub fn try_get(&self) -> Result<Option<i32>, CalibrationError> {
        let entries = self.read_entries()?;
        match entries.get(STORE_KEY) {
            None => Ok(None),
            Some(value) => value
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .map(Some)
                .ok_or_else(|| CalibrationError::StoreCorrupt {
                    reason: format!("{} is not an integer: {}", STORE_KEY, value),
                }),
        }
    }
}

impl CalibrationStore for FileCalibrationStore {
    fn get(&self) -> i32 {
        match self.try_get() {
            Ok(Some(offset)) => offset,
            Ok(None) => self.default_offset,
            Err(err) => {
                log_calibration_error(&err, "get_offset");
                self.default_offset
            }
        }
    }

    fn set(&self, offset: i32) -> Result<(), CalibrationError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| CalibrationError::StatePoisoned)?;

        // A corrupt file is replaced rather than blocking the save
        let mut entries = self.read_entries().unwrap_or_else(|err| {
            log_calibration_error(&err, "set_offset");
            BTreeMap::new()
        });
        entries.insert(STORE_KEY.to_string(), Value::from(offset));

        let write_failed = |reason: String| CalibrationError::StoreWriteFailed {
            path: self.path_string(),
            reason,
        };

        let json = serde_json::to_string_pretty(&entries).map_err(|e| write_failed(e.to_string()))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| write_failed(e.to_string()))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| write_failed(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| write_failed(e.to_string()))?;

        tracing::info!("[CalibrationStore] Saved offset {} to {}", offset, self.path_string());
        Ok(())
    }
}
