// Submission flow: recorded result + position -> stored report
//
// The flow locates the device, validates the report against the same
// rules the API enforces, and only then sends it. Every failure becomes a
// SubmissionError carrying the text shown to the user; nothing is sent
// after a failed step.

pub mod client;
pub mod geolocation;

pub use client::{NoiseApi, RouterClient};
pub use geolocation::{
    locate, FixedLocation, GeoPosition, GeolocationProvider, PositionRequest, ScriptedGeolocation,
};

use crate::config::ServerConfig;
use crate::error::SubmissionError;
use crate::http::SubmitResponse;
use crate::measurement::{NoiseSource, NoiseSubmission};
use crate::session::SessionResult;

/// What the user attaches to a finished recording
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasurementReport {
    pub decibels: f64,
    pub source: NoiseSource,
    pub annoyance_level: Option<u8>,
}

impl MeasurementReport {
    /// Report the rounded session average
    pub fn from_session(
        result: &SessionResult,
        source: NoiseSource,
        annoyance_level: Option<u8>,
    ) -> Self {
        Self {
            decibels: result.rounded_decibels(),
            source,
            annoyance_level,
        }
    }

    pub fn at(&self, position: GeoPosition) -> NoiseSubmission {
        NoiseSubmission::new(
            self.decibels,
            self.source,
            self.annoyance_level,
            position.latitude,
            position.longitude,
        )
    }
}

/// Locate, validate locally, then submit
///
/// `rules` mirrors the server's validation so an out-of-range reading or a
/// position outside the service area is reported without a round trip.
pub async fn submit_measurement(
    report: MeasurementReport,
    geolocation: &dyn GeolocationProvider,
    api: &dyn NoiseApi,
    rules: &ServerConfig,
) -> Result<SubmitResponse, SubmissionError> {
    let position = locate(geolocation)
        .await
        .inspect_err(|err| tracing::warn!("[Submission] Location failed: {}", err))?;

    let submission = report.at(position);
    submission
        .validate(rules)
        .inspect_err(|err| tracing::warn!("[Submission] Rejected locally: {}", err))?;

    let response = api
        .submit(&submission)
        .await
        .inspect_err(|err| tracing::warn!("[Submission] Submit failed: {}", err))?;

    tracing::info!(
        "[Submission] Report {} stored ({} dB)",
        response.data.report_id,
        response.data.noise_db_val
    );
    Ok(response)
}
