use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use time::OffsetDateTime;
use tower::ServiceExt;

use irrisync_server::models::Reading;

mod common;
use common::mock_app::MockApp;

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method(method)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_create_and_list_devices() {
    let app = MockApp::new().await;

    let request = json_request(
        Method::POST,
        "/api/devices",
        json!({ "deviceId": "dev1", "name": "Greenhouse North", "location": "Bed 3" }),
    );
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let device = response_json(response).await;
    assert_eq!(device["deviceId"], "dev1");
    assert_eq!(device["name"], "Greenhouse North");
    assert_eq!(device["location"], "Bed 3");
    assert_eq!(device["autoMode"], true);
    assert_eq!(device["isOnline"], false);
    assert_eq!(device["moistureThresholdLow"], 30.0);
    assert_eq!(device["moistureThresholdHigh"], 55.0);

    let request = Request::builder()
        .uri("/api/devices")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let devices = response_json(response).await;
    assert_eq!(devices.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_upsert_renames_existing_device() {
    let app = MockApp::new().await;
    app.devices.upsert_on_sighting("dev1").await.unwrap();

    let request = json_request(
        Method::POST,
        "/api/devices",
        json!({ "deviceId": "dev1", "name": "Renamed" }),
    );
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let devices = app.devices.all().await.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].name, "Renamed");
}

#[tokio::test]
async fn test_get_unknown_device_is_404() {
    let app = MockApp::new().await;

    let request = Request::builder()
        .uri("/api/devices/ghost")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_settings_rejects_inverted_thresholds() {
    let app = MockApp::new().await;
    app.devices.upsert_on_sighting("dev1").await.unwrap();

    let request = json_request(
        Method::PATCH,
        "/api/devices/dev1/settings",
        json!({ "moistureThresholdLow": 60.0, "moistureThresholdHigh": 40.0 }),
    );
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Nothing partially applied
    let device = app.devices.find_by_device_id("dev1").await.unwrap().unwrap();
    assert_eq!(device.moisture_low, 30.0);
    assert_eq!(device.moisture_high, 55.0);
}

#[tokio::test]
async fn test_settings_update() {
    let app = MockApp::new().await;
    app.devices.upsert_on_sighting("dev1").await.unwrap();

    let request = json_request(
        Method::PATCH,
        "/api/devices/dev1/settings",
        json!({
            "moistureThresholdLow": 25.0,
            "moistureThresholdHigh": 65.0,
            "notificationsEnabled": false
        }),
    );
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let device = response_json(response).await;
    assert_eq!(device["moistureThresholdLow"], 25.0);
    assert_eq!(device["moistureThresholdHigh"], 65.0);
    assert_eq!(device["notificationsEnabled"], false);
}

#[tokio::test]
async fn test_mode_route() {
    let app = MockApp::new().await;
    app.devices.upsert_on_sighting("dev1").await.unwrap();

    let request = json_request(
        Method::PATCH,
        "/api/devices/dev1/mode",
        json!({ "autoMode": false }),
    );
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["autoMode"], false);

    let request = json_request(
        Method::PATCH,
        "/api/devices/ghost/mode",
        json!({ "autoMode": true }),
    );
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_pump_control() {
    let app = MockApp::new().await;
    app.devices.upsert_on_sighting("dev2").await.unwrap();

    let request = json_request(
        Method::POST,
        "/api/devices/dev2/pump",
        json!({ "status": true, "autoMode": false }),
    );
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let ack = response_json(response).await;
    assert_eq!(ack["deviceId"], "dev2");
    assert_eq!(ack["pumpStatus"], true);
    assert_eq!(ack["autoMode"], false);
    assert_eq!(ack["message"], "Pump turned ON");

    // Mode persisted, one command published
    let device = app.devices.find_by_device_id("dev2").await.unwrap().unwrap();
    assert!(!device.auto_mode);

    let sent = app.transport.sent.lock().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].device_id, "dev2");
    assert!(sent[0].pump);
    assert!(!sent[0].auto);
}

#[tokio::test]
async fn test_pump_control_unknown_device() {
    let app = MockApp::new().await;

    let request = json_request(
        Method::POST,
        "/api/devices/ghost/pump",
        json!({ "status": true }),
    );
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    assert!(app.transport.sent.lock().await.is_empty());
}

#[tokio::test]
async fn test_pump_control_transport_failure() {
    let app = MockApp::with_failing_transport().await;
    app.devices.upsert_on_sighting("dev1").await.unwrap();

    let request = json_request(
        Method::POST,
        "/api/devices/dev1/pump",
        json!({ "status": true, "autoMode": false }),
    );
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    // The mode change is committed even though the command never left
    let device = app.devices.find_by_device_id("dev1").await.unwrap().unwrap();
    assert!(!device.auto_mode);
}

#[tokio::test]
async fn test_delete_device() {
    let app = MockApp::new().await;
    app.devices.upsert_on_sighting("dev1").await.unwrap();

    let request = Request::builder()
        .uri("/api/devices/dev1")
        .method(Method::DELETE)
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let request = Request::builder()
        .uri("/api/devices/dev1")
        .method(Method::DELETE)
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reading_history() {
    let app = MockApp::new().await;

    let now = OffsetDateTime::now_utc();
    for offset in 0..3 {
        app.readings
            .create(&Reading {
                id: 0,
                device_id: "dev1".to_string(),
                soil_moisture: 40.0 + offset as f64,
                temperature: 21.0,
                humidity: 50.0,
                pump_status: false,
                dht_error: false,
                time: now - time::Duration::minutes(offset * 10),
            })
            .await
            .unwrap();
    }

    let request = Request::builder()
        .uri("/api/devices/dev1/readings?limit=2")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let readings = response_json(response).await;
    let readings = readings.as_array().unwrap();
    assert_eq!(readings.len(), 2);
    assert_eq!(readings[0]["deviceId"], "dev1");
    assert!(readings[0].get("timestamp").is_some());
}
