use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::booking::{self, NewBooking, PaymentReceipt};
use crate::error::AppError;
use crate::models::booking::{Booking, BookingStatus};
use crate::models::location::Place;
use crate::models::payment::PaymentMethod;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings", post(create_booking).get(list_bookings))
        .route("/bookings/:id", get(get_booking))
        .route("/bookings/user/:user_id", get(user_bookings))
        .route("/bookings/:id/status", patch(update_status))
        .route("/bookings/:id/cancel", post(cancel_booking))
        .route("/bookings/:id/paid", post(mark_paid))
}

#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub vehicle_id: Uuid,
    pub user_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub pickup_location: Place,
    pub dropoff_location: Place,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: BookingStatus,
}

#[derive(Deserialize, Default)]
pub struct MarkPaidRequest {
    pub amount: Option<f64>,
    pub reference: Option<String>,
}

#[derive(Serialize)]
pub struct PaidResponse {
    pub message: &'static str,
    pub booking: Booking,
}

async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let booking = booking::create_booking(
        &state,
        NewBooking {
            vehicle_id: payload.vehicle_id,
            user_id: payload.user_id,
            start_date: payload.start_date,
            end_date: payload.end_date,
            pickup_location: payload.pickup_location,
            dropoff_location: payload.dropoff_location,
        },
    )?;

    Ok((StatusCode::CREATED, Json(booking)))
}

async fn list_bookings(State(state): State<Arc<AppState>>) -> Json<Vec<Booking>> {
    Json(booking::list_bookings(&state))
}

async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let booking = state
        .bookings
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("booking {} not found", id)))?;

    Ok(Json(booking.value().clone()))
}

async fn user_bookings(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Json<Vec<Booking>> {
    Json(booking::bookings_for_user(&state, user_id))
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Booking>, AppError> {
    booking::set_status(&state, id, payload.status).map(Json)
}

async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    booking::cancel_booking(&state, id).map(Json)
}

async fn mark_paid(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    payload: Option<Json<MarkPaidRequest>>,
) -> Result<Json<PaidResponse>, AppError> {
    let request = payload.map(|Json(body)| body).unwrap_or_default();
    let outcome = booking::mark_paid(
        &state,
        id,
        PaymentReceipt {
            method: PaymentMethod::Manual,
            amount: request.amount,
            reference: request.reference,
        },
    )?;

    let message = if outcome.already_paid {
        "booking already paid"
    } else {
        "booking marked as paid"
    };

    Ok(Json(PaidResponse {
        message,
        booking: outcome.booking,
    }))
}
