// Measurement storage behind the submission/retrieval API

use std::sync::RwLock;

use chrono::{DateTime, Utc};

use super::filter::MeasurementFilter;
use super::validation::NewMeasurement;
use super::NoiseMeasurement;
use crate::error::MeasurementError;

/// Wall clock used to stamp `recorded_at`
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Default clock backed by `Utc::now`
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub trait MeasurementRepository: Send + Sync {
    /// Store an accepted measurement, assigning its id and timestamp
    fn insert(&self, measurement: NewMeasurement) -> Result<NoiseMeasurement, MeasurementError>;

    /// Measurements matching `filter`, newest first
    fn list(&self, filter: &MeasurementFilter) -> Result<Vec<NoiseMeasurement>, MeasurementError>;
}

struct Inner {
    next_id: u64,
    rows: Vec<NoiseMeasurement>,
}

/// Process-local repository; contents are lost on shutdown
pub struct InMemoryRepository {
    inner: RwLock<Inner>,
    clock: Box<dyn Clock>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::with_clock(Box::new(SystemClock))
    }

    pub fn with_clock(clock: Box<dyn Clock>) -> Self {
        Self {
            inner: RwLock::new(Inner {
                next_id: 1,
                rows: Vec::new(),
            }),
            clock,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|inner| inner.rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned() -> MeasurementError {
    MeasurementError::StorageFailed {
        reason: "repository lock poisoned".to_string(),
    }
}

impl MeasurementRepository for InMemoryRepository {
    fn insert(&self, measurement: NewMeasurement) -> Result<NoiseMeasurement, MeasurementError> {
        let mut inner = self.inner.write().map_err(|_| poisoned())?;
        let stored = NoiseMeasurement {
            id: inner.next_id,
            decibels: measurement.decibels,
            source: measurement.source,
            annoyance_level: measurement.annoyance_level,
            latitude: measurement.latitude,
            longitude: measurement.longitude,
            recorded_at: self.clock.now(),
        };
        inner.next_id += 1;
        inner.rows.push(stored.clone());
        Ok(stored)
    }

    fn list(&self, filter: &MeasurementFilter) -> Result<Vec<NoiseMeasurement>, MeasurementError> {
        let inner = self.inner.read().map_err(|_| poisoned())?;
        let mut rows: Vec<NoiseMeasurement> = inner
            .rows
            .iter()
            .filter(|row| filter.matches(row))
            .cloned()
            .collect();
        // Newest first; later inserts win ties
        rows.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }
}
