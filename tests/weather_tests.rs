//! Integration tests for the weather page and the JSON weather API.

mod common;

use axum::http::StatusCode;
use common::{TestApp, body_json, body_text};
use dynasearch::clients::weatherbit::WeatherError;
use std::sync::atomic::Ordering;

#[tokio::test]
async fn test_api_weather_is_cached() {
    let mut app = TestApp::spawn().await;

    let response = app.get_json("/api/weather").await;
    assert_eq!(response.status(), StatusCode::OK);
    let first = body_json(response).await;
    assert_eq!(first["city_name"], "Copenhagen");

    let second = body_json(app.get_json("/api/weather").await).await;
    assert_eq!(first, second);
    assert_eq!(app.forecast.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_api_weather_unavailable() {
    let mut app = TestApp::spawn().await;
    app.forecast.failing_with(WeatherError::Api { status: 429 });

    let response = app.get_json("/api/weather").await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["status"], "error");
    assert_eq!(
        body["message"],
        "Failed to retrieve weather data. API responded with status: 429"
    );
}

#[tokio::test]
async fn test_failure_keeps_cached_forecast() {
    let mut app = TestApp::spawn().await;

    assert_eq!(app.get_json("/api/weather").await.status(), StatusCode::OK);
    app.forecast
        .failing_with(WeatherError::Connection("timed out".to_string()));

    // Still inside the TTL, so the upstream is not consulted.
    assert_eq!(app.get_json("/api/weather").await.status(), StatusCode::OK);
    assert_eq!(app.forecast.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_weather_page() {
    let mut app = TestApp::spawn().await;

    let response = app.get("/weather").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Weather forecast for Copenhagen"));
    assert!(html.contains("Light rain"));
}

#[tokio::test]
async fn test_weather_page_shows_upstream_error() {
    let mut app = TestApp::spawn().await;
    app.forecast.failing_with(WeatherError::Config);

    let response = app.get("/weather").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Weather service is not configured."));
    assert!(html.contains("No forecast available right now."));
}
