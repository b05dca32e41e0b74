use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::engine::{completion, handover};
use crate::error::AppError;
use crate::models::handover::Handover;
use crate::models::ride_history::RideHistory;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/handover/generate-pickup-otp/:booking_id", post(generate_pickup))
        .route("/handover/verify-pickup-otp/:booking_id", post(verify_pickup))
        .route("/handover/generate-dropoff-otp/:booking_id", post(generate_dropoff))
        .route("/handover/verify-dropoff-otp/:booking_id", post(verify_dropoff))
        .route("/handover/status/:booking_id", get(status))
        .route("/handover/history/user/:user_id", get(user_history))
        .route("/handover/history/admin", get(admin_history))
}

/// Clients send the code either as a string or as a bare number.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum OtpValue {
    Text(String),
    Number(u64),
}

impl OtpValue {
    fn into_code(self) -> String {
        match self {
            OtpValue::Text(text) => text,
            OtpValue::Number(number) => number.to_string(),
        }
    }
}

#[derive(Deserialize)]
pub struct VerifyOtpRequest {
    pub otp: OtpValue,
}

#[derive(Serialize)]
pub struct OtpIssued {
    pub message: &'static str,
    pub otp: String,
}

#[derive(Serialize)]
pub struct OtpVerified {
    pub message: &'static str,
    pub handover: Handover,
}

async fn generate_pickup(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<OtpIssued>, AppError> {
    let otp = handover::generate_pickup_otp(&state, booking_id)?;
    Ok(Json(OtpIssued {
        message: "Pickup OTP generated",
        otp,
    }))
}

async fn verify_pickup(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<Json<OtpVerified>, AppError> {
    let handover = handover::verify_pickup_otp(&state, booking_id, &payload.otp.into_code())?;
    Ok(Json(OtpVerified {
        message: "Pickup verified",
        handover,
    }))
}

async fn generate_dropoff(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<OtpIssued>, AppError> {
    let otp = handover::generate_dropoff_otp(&state, booking_id)?;
    Ok(Json(OtpIssued {
        message: "Dropoff OTP generated",
        otp,
    }))
}

async fn verify_dropoff(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<VerifyOtpRequest>,
) -> Result<Json<OtpVerified>, AppError> {
    let handover = handover::verify_dropoff_otp(&state, booking_id, &payload.otp.into_code())?;
    Ok(Json(OtpVerified {
        message: "Dropoff verified, ride completed",
        handover,
    }))
}

async fn status(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    match handover::handover_status(&state, booking_id) {
        Some(handover) => serde_json::to_value(handover)
            .map(Json)
            .map_err(|err| AppError::Internal(format!("failed to serialize handover: {err}"))),
        None => Ok(Json(json!({ "status": "none" }))),
    }
}

async fn user_history(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Json<Vec<RideHistory>> {
    Json(completion::history_for_user(&state, user_id))
}

async fn admin_history(State(state): State<Arc<AppState>>) -> Json<Vec<RideHistory>> {
    Json(completion::all_history(&state))
}
