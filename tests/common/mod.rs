#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use car_rental_hub::api::rest::router;
use car_rental_hub::config::Config;
use car_rental_hub::engine::events::DomainEvent;
use car_rental_hub::state::AppState;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceExt;

pub fn setup() -> (Router, Arc<AppState>, mpsc::Receiver<DomainEvent>) {
    let (state, rx) = AppState::new(&Config::default());
    let shared = Arc::new(state);
    (router(shared.clone()), shared, rx)
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn empty_post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, body_json(response).await)
}

pub async fn create_user(app: &Router, name: &str, email: &str, role: &str) -> String {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/users",
            json!({ "name": name, "email": email, "role": role }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

pub async fn create_vehicle(app: &Router, name: &str, daily_rate: f64) -> String {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/vehicles",
            json!({ "name": name, "brand": "Toyota", "daily_rate": daily_rate, "seats": 5 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

pub fn booking_body(vehicle_id: &str, user_id: &str, start: &str, end: &str) -> Value {
    json!({
        "vehicle_id": vehicle_id,
        "user_id": user_id,
        "start_date": start,
        "end_date": end,
        "pickup_location": {
            "address": "Airport Terminal 1",
            "coordinates": { "lat": 19.0896, "lng": 72.8656 }
        },
        "dropoff_location": {
            "address": "Central Station",
            "coordinates": { "lat": 18.9398, "lng": 72.8355 }
        }
    })
}

pub async fn create_booking(
    app: &Router,
    vehicle_id: &str,
    user_id: &str,
    start: &str,
    end: &str,
) -> (StatusCode, Value) {
    send(
        app,
        json_request("POST", "/bookings", booking_body(vehicle_id, user_id, start, end)),
    )
    .await
}

pub fn wrong_code(otp: &str) -> &'static str {
    if otp == "100000" { "100001" } else { "100000" }
}
