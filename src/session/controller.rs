// SessionController: lifecycle of a single noise recording
//
// State machine:
//   Idle --start--> Recording --duration reached--> Completed
//                   Recording --cancel--> Cancelled
//                   Recording --stream error--> Idle
// Completed and Cancelled accept a new `start`.
//
// The capture stream lives inside the active session, so every exit path
// (completion, cancellation, error, controller drop) releases the device.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;

use super::reduce::power_average;
use crate::audio::{AudioCapture, CaptureConstraints, CaptureStream, StreamStatus};
use crate::calibration::CalibrationStore;
use crate::config::{MeterConfig, SessionConfig};
use crate::error::{log_audio_error, AudioError};
use crate::meter::{InstantReading, LoudnessEstimator};

/// Progress channel capacity; ten seconds of 100 ms ticks
const PROGRESS_CHANNEL_CAPACITY: usize = 100;

/// Shared flag a caller sets to stop a blocking recording
pub type CancelToken = Arc<AtomicBool>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Recording,
    Completed,
    Cancelled,
}

/// Published once per tick while recording
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SessionProgress {
    pub elapsed_ms: u64,
    /// 0-100
    pub percent: f64,
    pub instant_db: f64,
}

/// Outcome of a completed session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionResult {
    /// Power-domain average of all readings; 0 when there were none
    pub average_decibels: f64,
    pub reading_count: usize,
    /// Offset snapshotted at start
    pub calibration_offset: i32,
    pub readings: Vec<InstantReading>,
}

impl SessionResult {
    fn from_readings(readings: Vec<InstantReading>, calibration_offset: i32) -> Self {
        let levels: Vec<f64> = readings.iter().map(|r| r.decibels).collect();
        Self {
            average_decibels: power_average(&levels),
            reading_count: readings.len(),
            calibration_offset,
            readings,
        }
    }

    /// Average rounded for display and submission
    pub fn rounded_decibels(&self) -> f64 {
        self.average_decibels.round()
    }
}

struct ActiveSession {
    stream: Box<dyn CaptureStream>,
    estimator: LoudnessEstimator,
    readings: Vec<InstantReading>,
}

pub struct SessionController {
    capture: Arc<dyn AudioCapture>,
    calibration: Arc<dyn CalibrationStore>,
    meter: MeterConfig,
    duration_ms: u64,
    state: SessionState,
    active: Option<ActiveSession>,
    last_result: Option<SessionResult>,
    progress_tx: broadcast::Sender<SessionProgress>,
}

impl SessionController {
    pub fn new(
        capture: Arc<dyn AudioCapture>,
        calibration: Arc<dyn CalibrationStore>,
        meter: MeterConfig,
        session: &SessionConfig,
    ) -> Self {
        let (progress_tx, _) = broadcast::channel(PROGRESS_CHANNEL_CAPACITY);
        Self {
            capture,
            calibration,
            meter,
            // A reversed window resolves to max_duration_ms
            duration_ms: session
                .duration_ms
                .max(session.min_duration_ms)
                .min(session.max_duration_ms),
            state: SessionState::Idle,
            active: None,
            last_result: None,
            progress_tx,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// Receiver for per-tick progress; lagging receivers lose old ticks
    pub fn subscribe(&self) -> broadcast::Receiver<SessionProgress> {
        self.progress_tx.subscribe()
    }

    /// Result of the most recent completed session
    pub fn last_result(&self) -> Option<&SessionResult> {
        self.last_result.as_ref()
    }

    /// Acquire the microphone and begin recording
    ///
    /// # Errors
    /// - `AlreadyRecording` if this controller is mid-session
    /// - Any acquisition error from the capture backend; the controller
    ///   stays in its previous state and holds no device
    pub fn start(&mut self) -> Result<(), AudioError> {
        if self.state == SessionState::Recording {
            return Err(AudioError::AlreadyRecording);
        }

        let stream = self
            .capture
            .acquire(&CaptureConstraints::RAW)
            .inspect_err(|err| log_audio_error(err, "session_start"))?;

        let offset = self.calibration.get();
        let estimator = LoudnessEstimator::with_sample_rate(&self.meter, offset, stream.sample_rate());

        tracing::info!(
            "[Session] Recording via {} @ {} Hz for {} ms (offset {})",
            self.capture.name(),
            stream.sample_rate(),
            self.duration_ms,
            offset
        );

        self.active = Some(ActiveSession {
            stream,
            estimator,
            readings: Vec::with_capacity((self.duration_ms / self.meter.tick_ms.max(1)) as usize),
        });
        self.last_result = None;
        self.state = SessionState::Recording;
        Ok(())
    }

    /// Drain captured audio and advance the session
    ///
    /// Returns `Some(result)` once the configured duration has been reached,
    /// or when a finite source runs out first.
    ///
    /// # Errors
    /// `NotRecording` outside a session; stream errors end the session,
    /// release the device and return the controller to `Idle`.
    pub fn pump(&mut self) -> Result<Option<SessionResult>, AudioError> {
        let Some(active) = self.active.as_mut() else {
            return Err(AudioError::NotRecording);
        };

        let duration_ms = self.duration_ms;
        let progress_tx = &self.progress_tx;
        let ActiveSession {
            stream,
            estimator,
            readings,
        } = active;

        let status = stream.read_available(&mut |frame| {
            estimator.push_samples(frame, |reading| {
                if reading.timestamp_offset_ms > duration_ms {
                    return;
                }
                readings.push(reading);
                let _ = progress_tx.send(SessionProgress {
                    elapsed_ms: reading.timestamp_offset_ms,
                    percent: (reading.timestamp_offset_ms as f64 / duration_ms as f64 * 100.0)
                        .min(100.0),
                    instant_db: reading.decibels,
                });
            });
        });

        let status = match status {
            Ok(status) => status,
            Err(err) => {
                log_audio_error(&err, "session_pump");
                self.active = None;
                self.state = SessionState::Idle;
                return Err(err);
            }
        };

        let reached = readings
            .last()
            .is_some_and(|r| r.timestamp_offset_ms >= duration_ms);
        if reached {
            return Ok(Some(self.finish()));
        }
        if status == StreamStatus::Ended {
            tracing::warn!(
                "[Session] Source ended after {} of {} ms",
                readings.last().map_or(0, |r| r.timestamp_offset_ms),
                duration_ms
            );
            return Ok(Some(self.finish()));
        }
        Ok(None)
    }

    fn finish(&mut self) -> SessionResult {
        // Dropping the session releases the stream before reduction
        let (readings, offset) = match self.active.take() {
            Some(active) => {
                let offset = active.estimator.offset();
                (active.readings, offset)
            }
            None => (Vec::new(), self.calibration.get()),
        };

        let result = SessionResult::from_readings(readings, offset);
        tracing::info!(
            "[Session] Completed: {:.1} dB over {} readings",
            result.average_decibels,
            result.reading_count
        );
        self.state = SessionState::Completed;
        self.last_result = Some(result.clone());
        result
    }

    /// Abort the current session; no result is produced
    ///
    /// Returns `false` when nothing was recording.
    pub fn cancel(&mut self) -> bool {
        if self.active.take().is_none() {
            return false;
        }
        tracing::info!("[Session] Cancelled");
        self.state = SessionState::Cancelled;
        true
    }

    /// Run a whole session on the calling thread
    ///
    /// Polls the stream every `poll_interval` until completion or until
    /// `cancel` is set. Returns `Ok(None)` when cancelled.
    pub fn record_blocking(
        &mut self,
        poll_interval: Duration,
        cancel: &CancelToken,
    ) -> Result<Option<SessionResult>, AudioError> {
        self.start()?;
        loop {
            if cancel.load(Ordering::Acquire) {
                self.cancel();
                return Ok(None);
            }
            if let Some(result) = self.pump()? {
                return Ok(Some(result));
            }
            std::thread::sleep(poll_interval);
        }
    }
}
