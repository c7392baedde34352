// API client seam and an in-process implementation over the axum router

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use futures::future::BoxFuture;
use serde::Deserialize;
use tower::ServiceExt;

use crate::error::SubmissionError;
use crate::http::SubmitResponse;
use crate::measurement::{FeatureCollection, NoiseSubmission};

/// Response bodies above this size are treated as a broken server
const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

/// The two calls the client side makes against the noise API
pub trait NoiseApi: Send + Sync {
    fn submit<'a>(
        &'a self,
        submission: &'a NoiseSubmission,
    ) -> BoxFuture<'a, Result<SubmitResponse, SubmissionError>>;

    fn fetch(&self) -> BoxFuture<'_, Result<FeatureCollection, SubmissionError>>;
}

/// Error body returned by the API on 4xx/5xx
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Pick the text shown to the user from an error body
///
/// `message` wins over `error`; an unreadable body falls back to the
/// status reason.
fn error_text(status: StatusCode, bytes: &[u8]) -> String {
    let body: ErrorBody = serde_json::from_slice(bytes).unwrap_or_default();
    body.message
        .or(body.error)
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unexpected response")
                .to_string()
        })
}

fn status_error(status: StatusCode, bytes: &[u8]) -> SubmissionError {
    let message = error_text(status, bytes);
    if status == StatusCode::BAD_REQUEST {
        SubmissionError::InvalidMeasurement { message }
    } else {
        SubmissionError::Server {
            status: status.as_u16(),
            message,
        }
    }
}

/// Drives an axum [`Router`] in-process, without a socket
#[derive(Clone)]
pub struct RouterClient {
    router: Router,
}

impl RouterClient {
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    async fn send(&self, request: Request<Body>) -> Result<(StatusCode, Vec<u8>), SubmissionError> {
        let response = match self.router.clone().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        };
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), MAX_BODY_BYTES)
            .await
            .map_err(|err| SubmissionError::Network {
                details: err.to_string(),
            })?;
        Ok((status, bytes.to_vec()))
    }
}

impl NoiseApi for RouterClient {
    fn submit<'a>(
        &'a self,
        submission: &'a NoiseSubmission,
    ) -> BoxFuture<'a, Result<SubmitResponse, SubmissionError>> {
        Box::pin(async move {
            let payload = serde_json::to_vec(submission).map_err(|err| {
                SubmissionError::InvalidMeasurement {
                    message: err.to_string(),
                }
            })?;
            let request = Request::builder()
                .method(Method::POST)
                .uri("/api/noise")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload))
                .map_err(|err| SubmissionError::Network {
                    details: err.to_string(),
                })?;

            let (status, bytes) = self.send(request).await?;
            if !status.is_success() {
                return Err(status_error(status, &bytes));
            }
            serde_json::from_slice(&bytes).map_err(|err| SubmissionError::Server {
                status: status.as_u16(),
                message: format!("Unreadable response: {}", err),
            })
        })
    }

    fn fetch(&self) -> BoxFuture<'_, Result<FeatureCollection, SubmissionError>> {
        Box::pin(async move {
            let request = Request::builder()
                .method(Method::GET)
                .uri("/api/noise")
                .body(Body::empty())
                .map_err(|err| SubmissionError::Network {
                    details: err.to_string(),
                })?;

            let (status, bytes) = self.send(request).await?;
            if !status.is_success() {
                return Err(status_error(status, &bytes));
            }
            serde_json::from_slice(&bytes).map_err(|err| SubmissionError::Server {
                status: status.as_u16(),
                message: format!("Unreadable response: {}", err),
            })
        })
    }
}
