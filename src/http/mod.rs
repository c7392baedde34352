//! Submission/retrieval HTTP API.
//!
//! An Axum router exposing measurement submission, GeoJSON retrieval and
//! health checks over a [`MeasurementRepository`](crate::measurement::MeasurementRepository).

mod routes;

pub use routes::{
    build_router, run_http_server, ApiError, ApiState, ListQuery, NoiseHealthResponse,
    StoredReport, SubmitResponse, SystemHealthResponse,
};
