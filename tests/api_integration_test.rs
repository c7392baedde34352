//! Submission and retrieval API, driven in-process through the router

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use noise_watch::config::ServerConfig;
use noise_watch::http::{build_router, ApiState};
use noise_watch::measurement::{extract_points, FeatureCollection, InMemoryRepository, NoiseSource};
use noise_watch::submission::{
    submit_measurement, FixedLocation, GeoPosition, MeasurementReport, NoiseApi, RouterClient,
};
use serde_json::{json, Value};
use tower::ServiceExt;

fn router() -> Router {
    build_router(ApiState::new(
        Arc::new(InMemoryRepository::new()),
        ServerConfig::default(),
    ))
}

async fn post(router: &Router, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/api/noise")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_valid_submission_is_created() {
    let router = router();
    let (status, body) = post(
        &router,
        json!({ "noise_db_val": 45, "latitude": 39.10, "longitude": 26.55 }),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Success");
    assert_eq!(body["data"]["noise_db_val"], 45.0);
}

#[tokio::test]
async fn test_quiet_reading_is_out_of_bounds() {
    let router = router();
    let (status, body) = post(
        &router,
        json!({ "noise_db_val": 20, "latitude": 39.10, "longitude": 26.55 }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid noise value");
    assert!(body["message"].as_str().unwrap().contains("out of bounds"));
}

#[tokio::test]
async fn test_far_latitude_is_outside_service_area() {
    let router = router();
    let (status, body) = post(
        &router,
        json!({ "noise_db_val": 45, "latitude": 10.0, "longitude": 26.55 }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Location out of bounds");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("outside the service area"));
}

#[tokio::test]
async fn test_submitted_reports_come_back_as_points() {
    let client = RouterClient::new(router());
    let rules = ServerConfig::default();

    for (decibels, source) in [(55.0, NoiseSource::Music), (72.0, NoiseSource::Traffic)] {
        let report = MeasurementReport {
            decibels,
            source,
            annoyance_level: Some(2),
        };
        let geo = FixedLocation(GeoPosition::new(39.10, 26.55));
        submit_measurement(report, &geo, &client, &rules).await.unwrap();
    }

    let collection: FeatureCollection = client.fetch().await.unwrap();
    let points = extract_points(&collection);

    // Newest first
    assert_eq!(points.len(), 2);
    assert_eq!(points[0].value, 72.0);
    assert_eq!(points[1].value, 55.0);
    assert_eq!(collection.features[0].source(), Some(NoiseSource::Traffic));
}
