use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use uuid::Uuid;

use crate::engine::tracking;
use crate::error::AppError;
use crate::models::location::VehicleLocation;
use crate::realtime::protocol::{LocationBroadcast, LocationReport};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/locations", post(report_location))
        .route("/locations/:booking_id", get(latest_location))
}

async fn report_location(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LocationReport>,
) -> Result<Json<LocationBroadcast>, AppError> {
    tracking::record_location(&state, payload).map(Json)
}

async fn latest_location(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<VehicleLocation>, AppError> {
    tracking::latest_location(&state, booking_id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("no location reported for booking {booking_id}")))
}
