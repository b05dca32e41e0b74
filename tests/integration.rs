mod common;

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use car_rental_hub::api::rest::router;
use car_rental_hub::clients::checkout::{CheckoutProvider, CheckoutSession, CheckoutStatus};
use car_rental_hub::clients::push::LoggingPushTransport;
use car_rental_hub::config::Config;
use car_rental_hub::engine::dispatcher::handle_event;
use car_rental_hub::error::AppError;
use car_rental_hub::state::AppState;
use serde_json::json;
use tower::ServiceExt;

use common::{
    body_json, body_string, booking_body, create_booking, create_user, create_vehicle, empty_post,
    get_request, json_request, send, setup,
};

#[tokio::test]
async fn health_returns_ok() {
    let (app, _state, _rx) = setup();
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["bookings"], 0);
    assert_eq!(body["rides"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let (app, _state, _rx) = setup();
    let response = app.oneshot(get_request("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("events_in_queue"));
    assert!(body.contains("realtime_connections"));
}

#[tokio::test]
async fn duplicate_email_returns_409() {
    let (app, _state, _rx) = setup();
    create_user(&app, "Asha", "asha@example.com", "user").await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/users",
            json!({ "name": "Asha Again", "email": "ASHA@example.com" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("already registered"));
}

#[tokio::test]
async fn push_subscriptions_are_deduplicated() {
    let (app, _state, _rx) = setup();
    let user_id = create_user(&app, "Ravi", "ravi@example.com", "user").await;
    let uri = format!("/users/{user_id}/push-subscriptions");
    let subscription = json!({ "endpoint": "https://push.example.com/abc" });

    send(&app, json_request("POST", &uri, subscription.clone())).await;
    let (status, body) = send(&app, json_request("POST", &uri, subscription)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["push_subscriptions"].as_array().unwrap().len(), 1);

    let (_, body) = send(
        &app,
        json_request("DELETE", &uri, json!({ "endpoint": "https://push.example.com/abc" })),
    )
    .await;
    assert!(body["push_subscriptions"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn vehicle_listing_is_refreshed_after_update() {
    let (app, _state, _rx) = setup();
    let vehicle_id = create_vehicle(&app, "Corolla", 45.0).await;

    let (status, listing) = send(&app, get_request("/vehicles")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing[0]["daily_rate"], 45.0);

    let (status, _) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/vehicles/{vehicle_id}"),
            json!({ "daily_rate": 60.0 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, listing) = send(&app, get_request("/vehicles")).await;
    assert_eq!(listing[0]["daily_rate"], 60.0);

    let (_, single) = send(&app, get_request(&format!("/vehicles/{vehicle_id}"))).await;
    assert_eq!(single["daily_rate"], 60.0);
}

#[tokio::test]
async fn vehicle_with_open_bookings_cannot_be_deleted() {
    let (app, _state, _rx) = setup();
    let user_id = create_user(&app, "Dev", "dev@example.com", "user").await;
    let vehicle_id = create_vehicle(&app, "Ertiga", 45.0).await;
    let (_, booking) = create_booking(
        &app,
        &vehicle_id,
        &user_id,
        "2026-12-10T09:00:00Z",
        "2026-12-11T09:00:00Z",
    )
    .await;
    let uri = format!("/vehicles/{vehicle_id}");

    let (status, _) = send(&app, json_request("DELETE", &uri, json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    send(
        &app,
        json_request(
            "PATCH",
            &format!("/bookings/{}/status", booking["id"].as_str().unwrap()),
            json!({ "status": "denied" }),
        ),
    )
    .await;

    let (status, _) = send(&app, json_request("DELETE", &uri, json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, get_request(&uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn deleted_vehicle_never_keeps_a_new_booking() {
    let (app, state, _rx) = setup();
    let user_id = create_user(&app, "Zoya", "zoya@example.com", "user").await;

    for _ in 0..50 {
        let vehicle_id = create_vehicle(&app, "Kwid", 25.0).await;

        let booking_app = app.clone();
        let body = booking_body(
            &vehicle_id,
            &user_id,
            "2026-12-20T09:00:00Z",
            "2026-12-21T09:00:00Z",
        );
        let booking = tokio::spawn(async move {
            send(&booking_app, json_request("POST", "/bookings", body)).await.0
        });
        let delete_app = app.clone();
        let uri = format!("/vehicles/{vehicle_id}");
        let delete = tokio::spawn(async move {
            send(&delete_app, json_request("DELETE", &uri, json!({}))).await.0
        });

        let booked = booking.await.unwrap() == StatusCode::CREATED;
        let deleted = delete.await.unwrap() == StatusCode::OK;
        assert!(!(booked && deleted));
        if deleted {
            let orphaned = state
                .bookings
                .iter()
                .any(|entry| entry.value().vehicle_id.to_string() == vehicle_id);
            assert!(!orphaned);
        }
    }
}

#[tokio::test]
async fn vehicle_with_zero_rate_returns_400() {
    let (app, _state, _rx) = setup();
    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/vehicles",
            json!({ "name": "Free car", "brand": "Nope", "daily_rate": 0.0, "seats": 4 }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_booking_computes_duration_and_amount() {
    let (app, _state, _rx) = setup();
    let user_id = create_user(&app, "Meera", "meera@example.com", "user").await;
    let vehicle_id = create_vehicle(&app, "Swift", 50.0).await;

    let (status, body) = create_booking(
        &app,
        &vehicle_id,
        &user_id,
        "2026-11-01T10:00:00Z",
        "2026-11-03T12:00:00Z",
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["paid"], false);
    assert_eq!(body["duration_days"], 3);
    assert_eq!(body["total_amount"], 150.0);
    assert_eq!(body["vehicle_name"], "Swift");
    assert_eq!(body["user_email"], "meera@example.com");
}

#[tokio::test]
async fn booking_with_end_before_start_returns_400() {
    let (app, _state, _rx) = setup();
    let user_id = create_user(&app, "Kiran", "kiran@example.com", "user").await;
    let vehicle_id = create_vehicle(&app, "City", 30.0).await;

    let (status, body) = create_booking(
        &app,
        &vehicle_id,
        &user_id,
        "2026-11-05T10:00:00Z",
        "2026-11-05T10:00:00Z",
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("end date"));
}

#[tokio::test]
async fn booking_unknown_vehicle_returns_404() {
    let (app, _state, _rx) = setup();
    let user_id = create_user(&app, "Kiran", "kiran@example.com", "user").await;

    let (status, _) = create_booking(
        &app,
        "00000000-0000-0000-0000-000000000000",
        &user_id,
        "2026-11-01T10:00:00Z",
        "2026-11-02T10:00:00Z",
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn identical_dates_on_same_vehicle_are_rejected() {
    let (app, _state, _rx) = setup();
    let first_user = create_user(&app, "Anil", "anil@example.com", "user").await;
    let second_user = create_user(&app, "Bina", "bina@example.com", "user").await;
    let vehicle_id = create_vehicle(&app, "Creta", 80.0).await;

    let (status, _) = create_booking(
        &app,
        &vehicle_id,
        &first_user,
        "2026-12-10T09:00:00Z",
        "2026-12-12T09:00:00Z",
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = create_booking(
        &app,
        &vehicle_id,
        &second_user,
        "2026-12-10T09:00:00Z",
        "2026-12-12T09:00:00Z",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("already booked"));
}

#[tokio::test]
async fn denied_booking_frees_the_dates() {
    let (app, _state, _rx) = setup();
    let user_id = create_user(&app, "Dev", "dev@example.com", "user").await;
    let vehicle_id = create_vehicle(&app, "Nexon", 70.0).await;

    let (_, first) = create_booking(
        &app,
        &vehicle_id,
        &user_id,
        "2026-12-01T09:00:00Z",
        "2026-12-04T09:00:00Z",
    )
    .await;
    let first_id = first["id"].as_str().unwrap();

    let (status, body) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/bookings/{first_id}/status"),
            json!({ "status": "denied" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "denied");

    let (status, _) = create_booking(
        &app,
        &vehicle_id,
        &user_id,
        "2026-12-02T09:00:00Z",
        "2026-12-03T09:00:00Z",
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn status_endpoint_only_accepts_approve_or_deny_from_pending() {
    let (app, _state, _rx) = setup();
    let user_id = create_user(&app, "Esha", "esha@example.com", "user").await;
    let vehicle_id = create_vehicle(&app, "i20", 40.0).await;
    let (_, booking) = create_booking(
        &app,
        &vehicle_id,
        &user_id,
        "2026-12-01T09:00:00Z",
        "2026-12-02T09:00:00Z",
    )
    .await;
    let uri = format!("/bookings/{}/status", booking["id"].as_str().unwrap());

    let (status, _) = send(&app, json_request("PATCH", &uri, json!({ "status": "completed" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, json_request("PATCH", &uri, json!({ "status": "approved" }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, json_request("PATCH", &uri, json!({ "status": "denied" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("approved"));
}

#[tokio::test]
async fn mark_paid_twice_records_one_payment() {
    let (app, _state, _rx) = setup();
    let user_id = create_user(&app, "Farah", "farah@example.com", "user").await;
    let vehicle_id = create_vehicle(&app, "Verna", 55.0).await;
    let (_, booking) = create_booking(
        &app,
        &vehicle_id,
        &user_id,
        "2026-12-01T09:00:00Z",
        "2026-12-03T09:00:00Z",
    )
    .await;
    let uri = format!("/bookings/{}/paid", booking["id"].as_str().unwrap());

    let (status, first) = send(&app, empty_post(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["message"], "booking marked as paid");
    assert_eq!(first["booking"]["paid"], true);

    let (status, second) = send(&app, empty_post(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["message"], "booking already paid");
    assert_eq!(second["booking"]["paid"], true);

    let (_, payments) = send(&app, get_request("/payments")).await;
    let payments = payments.as_array().unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0]["amount"], 110.0);
    assert_eq!(payments[0]["method"], "manual");
}

#[tokio::test]
async fn non_positive_payment_amount_is_rejected() {
    let (app, _state, _rx) = setup();
    let user_id = create_user(&app, "Kabir", "kabir@example.com", "user").await;
    let vehicle_id = create_vehicle(&app, "Creta", 60.0).await;
    let (_, booking) = create_booking(
        &app,
        &vehicle_id,
        &user_id,
        "2026-12-05T09:00:00Z",
        "2026-12-06T09:00:00Z",
    )
    .await;
    let booking_id = booking["id"].as_str().unwrap();
    let uri = format!("/bookings/{booking_id}/paid");

    for amount in [json!(-5), json!(0)] {
        let (status, body) = send(&app, json_request("POST", &uri, json!({ "amount": amount }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("positive"));
    }

    let (_, payments) = send(&app, get_request("/payments")).await;
    assert!(payments.as_array().unwrap().is_empty());
    let (_, stored) = send(&app, get_request(&format!("/bookings/{booking_id}"))).await;
    assert_eq!(stored["paid"], false);

    let (status, _) = send(&app, json_request("POST", &uri, json!({ "amount": 60.0 }))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn payment_verification_without_provider_returns_502() {
    let (app, _state, _rx) = setup();
    let user_id = create_user(&app, "Gita", "gita@example.com", "user").await;
    let vehicle_id = create_vehicle(&app, "Baleno", 35.0).await;
    let (_, booking) = create_booking(
        &app,
        &vehicle_id,
        &user_id,
        "2026-12-01T09:00:00Z",
        "2026-12-02T09:00:00Z",
    )
    .await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/payments/verify",
            json!({ "booking_id": booking["id"], "session_id": "cs_test_1" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(!body["error"].as_str().unwrap().contains("cs_test_1"));
}

struct CompletedCheckout;

#[async_trait]
impl CheckoutProvider for CompletedCheckout {
    async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession, AppError> {
        let status = if session_id.starts_with("cs_open") {
            CheckoutStatus::Open
        } else {
            CheckoutStatus::Complete
        };
        Ok(CheckoutSession {
            id: session_id.to_string(),
            status,
            amount_total: Some(35.0),
            booking_id: None,
        })
    }
}

#[tokio::test]
async fn completed_checkout_session_marks_booking_paid() {
    let (state, _rx) = AppState::with_integrations(
        &Config::default(),
        Arc::new(LoggingPushTransport),
        Arc::new(CompletedCheckout),
    );
    let app = router(Arc::new(state));
    let user_id = create_user(&app, "Hari", "hari@example.com", "user").await;
    let vehicle_id = create_vehicle(&app, "Alto", 35.0).await;
    let (_, booking) = create_booking(
        &app,
        &vehicle_id,
        &user_id,
        "2026-12-01T09:00:00Z",
        "2026-12-02T09:00:00Z",
    )
    .await;

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/payments/verify",
            json!({ "booking_id": booking["id"], "session_id": "cs_open_1" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/payments/verify",
            json!({ "booking_id": booking["id"], "session_id": "cs_paid_1" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "payment verified");
    assert_eq!(body["booking"]["paid"], true);

    let (_, payments) = send(&app, get_request("/payments")).await;
    assert_eq!(payments[0]["reference"], "cs_paid_1");
    assert_eq!(payments[0]["method"], "checkout");
}

#[tokio::test]
async fn dispatcher_writes_admin_and_user_notifications() {
    let (app, state, mut rx) = setup();

    let admin_id = create_user(&app, "Ops", "ops@example.com", "admin").await;
    let user_id = create_user(&app, "Isha", "isha@example.com", "user").await;
    let vehicle_id = create_vehicle(&app, "Thar", 90.0).await;
    let (_, booking) = create_booking(
        &app,
        &vehicle_id,
        &user_id,
        "2026-12-01T09:00:00Z",
        "2026-12-02T09:00:00Z",
    )
    .await;
    let booking_id = booking["id"].as_str().unwrap();

    send(
        &app,
        json_request(
            "PATCH",
            &format!("/bookings/{booking_id}/status"),
            json!({ "status": "approved" }),
        ),
    )
    .await;

    while let Ok(event) = rx.try_recv() {
        handle_event(&state, event).await.unwrap();
    }

    let (_, admin_feed) = send(&app, get_request("/notifications/admin")).await;
    let admin_feed = admin_feed.as_array().unwrap();
    assert!(admin_feed.iter().all(|n| n["user_id"] == admin_id));
    assert!(admin_feed
        .iter()
        .any(|n| n["type"] == "booking" && n["title"] == "New booking request"));
    assert!(admin_feed.iter().any(|n| n["type"] == "signup"));

    let (_, user_feed) = send(&app, get_request(&format!("/notifications/user/{user_id}"))).await;
    let user_feed = user_feed.as_array().unwrap();
    assert_eq!(user_feed.len(), 1);
    assert_eq!(user_feed[0]["title"], "Booking approved");
    assert_eq!(user_feed[0]["is_read"], false);

    let notification_id = user_feed[0]["id"].as_str().unwrap();
    let (status, body) = send(
        &app,
        json_request(
            "PATCH",
            &format!("/notifications/{notification_id}/read"),
            json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_read"], true);
}

#[tokio::test]
async fn chat_messages_are_stored_in_order() {
    let (app, _state, _rx) = setup();
    let admin_id = create_user(&app, "Support", "support@example.com", "admin").await;
    let user_id = create_user(&app, "Jai", "jai@example.com", "user").await;

    for (from, to, text) in [
        (&user_id, &admin_id, "Is the car ready?"),
        (&admin_id, &user_id, "Yes, bay 4."),
    ] {
        let (status, _) = send(
            &app,
            json_request(
                "POST",
                "/chat/messages",
                json!({ "sender_id": from, "receiver_id": to, "content": text }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, conversation) = send(&app, get_request(&format!("/chat/{admin_id}/{user_id}"))).await;
    let conversation = conversation.as_array().unwrap();
    assert_eq!(conversation.len(), 2);
    assert_eq!(conversation[0]["content"], "Is the car ready?");
    assert_eq!(conversation[1]["content"], "Yes, bay 4.");
}

#[tokio::test]
async fn empty_chat_message_returns_400() {
    let (app, _state, _rx) = setup();
    let a = create_user(&app, "A", "a@example.com", "user").await;
    let b = create_user(&app, "B", "b@example.com", "admin").await;

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/chat/messages",
            json!({ "sender_id": a, "receiver_id": b, "content": "   " }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn location_report_keeps_latest_position() {
    let (app, _state, _rx) = setup();
    let user_id = create_user(&app, "Kabir", "kabir@example.com", "user").await;
    let vehicle_id = create_vehicle(&app, "XUV", 95.0).await;
    let (_, booking) = create_booking(
        &app,
        &vehicle_id,
        &user_id,
        "2026-12-01T09:00:00Z",
        "2026-12-02T09:00:00Z",
    )
    .await;
    let booking_id = booking["id"].as_str().unwrap();

    let (status, _) = send(&app, get_request(&format!("/locations/{booking_id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    for (lat, lng) in [(19.05, 72.86), (18.94, 72.8355)] {
        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/locations",
                json!({ "booking_id": booking_id, "lat": lat, "lng": lng }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["distance_to_dropoff_km"].as_f64().unwrap() >= 0.0);
    }

    let (status, latest) = send(&app, get_request(&format!("/locations/{booking_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(latest["position"]["lat"], 18.94);
    assert_eq!(latest["vehicle_id"], vehicle_id);
}
