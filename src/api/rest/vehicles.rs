use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::cache::{vehicle_key, VEHICLES_PREFIX, VEHICLE_LIST_KEY};
use crate::error::AppError;
use crate::models::vehicle::Vehicle;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/vehicles", post(create_vehicle).get(list_vehicles))
        .route(
            "/vehicles/:id",
            get(get_vehicle).patch(update_vehicle).delete(delete_vehicle),
        )
}

#[derive(Deserialize)]
pub struct CreateVehicleRequest {
    pub name: String,
    pub brand: String,
    pub daily_rate: f64,
    pub seats: u8,
    #[serde(default = "available_by_default")]
    pub available: bool,
}

#[derive(Deserialize)]
pub struct UpdateVehicleRequest {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub daily_rate: Option<f64>,
    pub seats: Option<u8>,
    pub available: Option<bool>,
}

fn available_by_default() -> bool {
    true
}

fn validate_rate(daily_rate: f64) -> Result<(), AppError> {
    if !daily_rate.is_finite() || daily_rate <= 0.0 {
        return Err(AppError::Validation("daily_rate must be > 0".to_string()));
    }
    Ok(())
}

fn cached(state: &AppState, key: &str) -> Option<Value> {
    let hit = state.listing_cache.get(key);
    let result = if hit.is_some() { "hit" } else { "miss" };
    state
        .metrics
        .listing_cache_lookups_total
        .with_label_values(&[result])
        .inc();
    hit
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, AppError> {
    serde_json::to_value(value)
        .map_err(|err| AppError::Internal(format!("failed to serialize vehicle: {err}")))
}

async fn create_vehicle(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateVehicleRequest>,
) -> Result<(StatusCode, Json<Vehicle>), AppError> {
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }
    validate_rate(payload.daily_rate)?;
    if payload.seats == 0 {
        return Err(AppError::Validation("seats must be > 0".to_string()));
    }

    let now = Utc::now();
    let vehicle = Vehicle {
        id: Uuid::new_v4(),
        name: payload.name.trim().to_string(),
        brand: payload.brand.trim().to_string(),
        daily_rate: payload.daily_rate,
        seats: payload.seats,
        available: payload.available,
        created_at: now,
        updated_at: now,
    };

    state.vehicles.insert(vehicle.id, vehicle.clone());
    state.listing_cache.invalidate_prefix(VEHICLES_PREFIX);

    info!(vehicle_id = %vehicle.id, "vehicle listed");
    Ok((StatusCode::CREATED, Json(vehicle)))
}

async fn list_vehicles(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    if let Some(listing) = cached(&state, VEHICLE_LIST_KEY) {
        return Ok(Json(listing));
    }

    let mut vehicles: Vec<Vehicle> = state
        .vehicles
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    vehicles.sort_by(|a, b| a.created_at.cmp(&b.created_at));

    let listing = to_json(&vehicles)?;
    state.listing_cache.set(VEHICLE_LIST_KEY, listing.clone());
    Ok(Json(listing))
}

async fn get_vehicle(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let key = vehicle_key(&id);
    if let Some(vehicle) = cached(&state, &key) {
        return Ok(Json(vehicle));
    }

    let vehicle = state
        .vehicles
        .get(&id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("vehicle {} not found", id)))?;

    let value = to_json(&vehicle)?;
    state.listing_cache.set(&key, value.clone());
    Ok(Json(value))
}

async fn update_vehicle(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateVehicleRequest>,
) -> Result<Json<Vehicle>, AppError> {
    if let Some(rate) = payload.daily_rate {
        validate_rate(rate)?;
    }

    let updated = {
        let mut vehicle = state
            .vehicles
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("vehicle {} not found", id)))?;

        if let Some(name) = payload.name.filter(|name| !name.trim().is_empty()) {
            vehicle.name = name.trim().to_string();
        }
        if let Some(brand) = payload.brand {
            vehicle.brand = brand.trim().to_string();
        }
        if let Some(rate) = payload.daily_rate {
            vehicle.daily_rate = rate;
        }
        if let Some(seats) = payload.seats.filter(|seats| *seats > 0) {
            vehicle.seats = seats;
        }
        if let Some(available) = payload.available {
            vehicle.available = available;
        }
        vehicle.updated_at = Utc::now();
        vehicle.clone()
    };

    state.listing_cache.invalidate_prefix(VEHICLES_PREFIX);
    Ok(Json(updated))
}

async fn delete_vehicle(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    // The scan runs under the vehicle's write lock, the same lock
    // `create_booking` holds while it checks and inserts.
    let mut in_use = false;
    let removed = state.vehicles.remove_if(&id, |_, _| {
        in_use = state
            .bookings
            .iter()
            .any(|entry| entry.value().vehicle_id == id && entry.value().status.blocks_vehicle());
        !in_use
    });

    if removed.is_none() {
        return Err(if in_use {
            AppError::InvalidState("vehicle has pending or approved bookings".to_string())
        } else {
            AppError::NotFound(format!("vehicle {} not found", id))
        });
    }
    state.listing_cache.invalidate_prefix(VEHICLES_PREFIX);

    info!(vehicle_id = %id, "vehicle removed");
    Ok(Json(json!({ "message": "vehicle deleted" })))
}
