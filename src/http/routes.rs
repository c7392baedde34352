use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ServerConfig;
use crate::error::{log_measurement_error, MeasurementError};
use crate::measurement::{
    FeatureCollection, MeasurementFilter, MeasurementRepository, NoiseSource, NoiseSubmission,
    TimeOfDay,
};

/// Shared application state for HTTP handlers.
#[derive(Clone)]
pub struct ApiState {
    repository: Arc<dyn MeasurementRepository>,
    rules: Arc<ServerConfig>,
}

impl ApiState {
    pub fn new(repository: Arc<dyn MeasurementRepository>, rules: ServerConfig) -> Self {
        Self {
            repository,
            rules: Arc::new(rules),
        }
    }
}

/// HTTP error variants mapped to `{error, message}` JSON responses.
#[derive(Debug)]
pub enum ApiError {
    /// Submission failed validation
    Rejected(MeasurementError),
    /// Body or query string could not be decoded
    BadRequest(String),
    Internal(String),
}

impl From<MeasurementError> for ApiError {
    fn from(err: MeasurementError) -> Self {
        match err {
            MeasurementError::StorageFailed { reason } => ApiError::Internal(reason),
            rejected => ApiError::Rejected(rejected),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use crate::error::ErrorCode;

        let (status, error, message) = match self {
            Self::Rejected(err) => (StatusCode::BAD_REQUEST, err.title().to_string(), err.message()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "Invalid request".to_string(), msg),
            Self::Internal(msg) => {
                tracing::error!("[Api] Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server Error".to_string(), msg)
            }
        };

        (
            status,
            Json(serde_json::json!({ "error": error, "message": message })),
        )
            .into_response()
    }
}

/// `GET /api/noise/health` payload.
#[derive(Debug, Serialize)]
pub struct NoiseHealthResponse {
    pub status: &'static str,
    pub message: &'static str,
}

/// `GET /api/health` payload.
#[derive(Debug, Serialize)]
pub struct SystemHealthResponse {
    pub status: &'static str,
    pub system: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// Fields echoed back after a successful submission.
#[derive(Debug, Serialize, Deserialize)]
pub struct StoredReport {
    pub report_id: u64,
    pub noise_db_val: f64,
    pub rec_time: DateTime<Utc>,
}

/// `POST /api/noise` success payload.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub message: String,
    pub data: StoredReport,
}

/// Optional filters accepted by `GET /api/noise`.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Source category, or `all`
    pub source: Option<String>,
    pub time_of_day: Option<TimeOfDay>,
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub utc_offset_secs: Option<i32>,
}

impl ListQuery {
    fn into_filter(self) -> Result<MeasurementFilter, MeasurementError> {
        let source = match self.source.as_deref() {
            None | Some("") | Some("all") => None,
            Some(raw) => Some(raw.parse::<NoiseSource>()?),
        };
        Ok(MeasurementFilter {
            source,
            from: self.from,
            until: self.until,
            time_of_day: self.time_of_day,
            utc_offset_secs: self.utc_offset_secs.unwrap_or(0),
        })
    }
}

/// Build the Axum router with all handlers.
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/noise", get(list_noise).post(submit_noise))
        .route("/api/noise/health", get(noise_health))
        .route("/api/health", get(system_health))
        .with_state(state)
}

/// Run the HTTP server loop.
pub async fn run_http_server(state: ApiState, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding API listener on {addr}"))?;
    tracing::info!("[Api] Listening on http://{}", addr);
    let router = build_router(state);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving API router")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("[Api] Could not listen for ctrl-c: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("[Api] Shutting down");
}

pub async fn list_noise(
    State(state): State<ApiState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<FeatureCollection>, ApiError> {
    let Query(query) = query?;
    let filter = query.into_filter()?;
    let rows = state.repository.list(&filter)?;

    tracing::debug!("[Api] Served {} points", rows.len());
    Ok(Json(FeatureCollection::from_measurements(&rows)))
}

pub async fn submit_noise(
    State(state): State<ApiState>,
    body: Result<Json<NoiseSubmission>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    let Json(submission) = body?;

    let accepted = submission
        .validate(&state.rules)
        .inspect_err(|err| log_measurement_error(err, "submit_noise"))?;
    let stored = state.repository.insert(accepted)?;

    tracing::info!(
        "[Api] Stored report {} ({} dB, {})",
        stored.id,
        stored.decibels,
        stored.source
    );

    Ok((
        StatusCode::CREATED,
        Json(SubmitResponse {
            message: "Success".to_string(),
            data: StoredReport {
                report_id: stored.id,
                noise_db_val: stored.decibels,
                rec_time: stored.recorded_at,
            },
        }),
    ))
}

pub async fn noise_health() -> Json<NoiseHealthResponse> {
    Json(NoiseHealthResponse {
        status: "UP",
        message: "Noise API is running",
    })
}

pub async fn system_health() -> Json<SystemHealthResponse> {
    Json(SystemHealthResponse {
        status: "UP",
        system: "Noise Watch Backend",
        timestamp: Utc::now(),
    })
}
