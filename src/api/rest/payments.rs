use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::rest::bookings::PaidResponse;
use crate::engine::payments;
use crate::error::AppError;
use crate::models::payment::Payment;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/payments", get(list_payments))
        .route("/payments/verify", post(verify_payment))
}

#[derive(Deserialize)]
pub struct VerifyPaymentRequest {
    pub booking_id: Uuid,
    pub session_id: String,
}

async fn verify_payment(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<VerifyPaymentRequest>,
) -> Result<Json<PaidResponse>, AppError> {
    let outcome =
        payments::verify_checkout(&state, payload.booking_id, &payload.session_id).await?;

    let message = if outcome.already_paid {
        "booking already paid"
    } else {
        "payment verified"
    };

    Ok(Json(PaidResponse {
        message,
        booking: outcome.booking,
    }))
}

async fn list_payments(State(state): State<Arc<AppState>>) -> Json<Vec<Payment>> {
    Json(payments::list_payments(&state))
}
