// Geolocation collaborator and the precise-then-coarse lookup

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use futures::future::{self, BoxFuture};
use serde::{Deserialize, Serialize};

use crate::error::GeolocationError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy in metres, when known
    pub accuracy_m: Option<f64>,
}

impl GeoPosition {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_m: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionRequest {
    pub high_accuracy: bool,
    pub timeout: Duration,
    /// Oldest cached fix the provider may return
    pub maximum_age: Duration,
}

impl PositionRequest {
    /// First attempt: GPS-grade fix
    pub const PRECISE: Self = Self {
        high_accuracy: true,
        timeout: Duration::from_secs(10),
        maximum_age: Duration::from_secs(10),
    };

    /// Retry after a timeout: any recent fix will do
    pub const COARSE: Self = Self {
        high_accuracy: false,
        timeout: Duration::from_secs(10),
        maximum_age: Duration::from_secs(60),
    };
}

pub trait GeolocationProvider: Send + Sync {
    fn current_position<'a>(
        &'a self,
        request: &'a PositionRequest,
    ) -> BoxFuture<'a, Result<GeoPosition, GeolocationError>>;
}

/// Ask for a precise fix; on timeout retry once at low accuracy
///
/// Permission and availability errors are returned without a retry.
pub async fn locate(provider: &dyn GeolocationProvider) -> Result<GeoPosition, GeolocationError> {
    match provider.current_position(&PositionRequest::PRECISE).await {
        Err(GeolocationError::Timeout) => {
            tracing::warn!("[Geolocation] High accuracy fix timed out, retrying at low accuracy");
            provider.current_position(&PositionRequest::COARSE).await
        }
        other => other,
    }
}

/// Always reports the same position
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub GeoPosition);

impl GeolocationProvider for FixedLocation {
    fn current_position<'a>(
        &'a self,
        _request: &'a PositionRequest,
    ) -> BoxFuture<'a, Result<GeoPosition, GeolocationError>> {
        Box::pin(future::ready(Ok(self.0)))
    }
}

/// Replays queued answers and records every request
///
/// Once the queue is exhausted every request fails with
/// `PositionUnavailable`.
#[derive(Debug, Default)]
pub struct ScriptedGeolocation {
    answers: Mutex<VecDeque<Result<GeoPosition, GeolocationError>>>,
    requests: Mutex<Vec<PositionRequest>>,
}

impl ScriptedGeolocation {
    pub fn new(answers: impl IntoIterator<Item = Result<GeoPosition, GeolocationError>>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<PositionRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

impl GeolocationProvider for ScriptedGeolocation {
    fn current_position<'a>(
        &'a self,
        request: &'a PositionRequest,
    ) -> BoxFuture<'a, Result<GeoPosition, GeolocationError>> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(*request);
        }
        let answer = self
            .answers
            .lock()
            .ok()
            .and_then(|mut answers| answers.pop_front())
            .unwrap_or(Err(GeolocationError::PositionUnavailable));
        Box::pin(future::ready(answer))
    }
}
