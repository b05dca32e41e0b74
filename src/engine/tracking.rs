use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::geo::remaining_km;
use crate::models::location::{GeoPoint, VehicleLocation};
use crate::realtime::protocol::{LocationBroadcast, LocationReport, ServerEvent};
use crate::realtime::Group;
use crate::state::AppState;

/// Stores the latest position for the booking and relays it to admins and
/// the renter.
pub fn record_location(state: &AppState, report: LocationReport) -> AppResult<LocationBroadcast> {
    let position = GeoPoint {
        lat: report.lat,
        lng: report.lng,
    };
    if !position.is_valid() {
        return Err(AppError::Validation("coordinates are out of range".to_string()));
    }

    let (vehicle_id, user_id, dropoff) = state
        .bookings
        .get(&report.booking_id)
        .map(|booking| {
            (
                booking.vehicle_id,
                booking.user_id,
                booking.dropoff_location.clone(),
            )
        })
        .ok_or_else(|| AppError::NotFound(format!("booking {} not found", report.booking_id)))?;

    let now = Utc::now();
    state.vehicle_locations.insert(
        report.booking_id,
        VehicleLocation {
            booking_id: report.booking_id,
            vehicle_id,
            user_id,
            position,
            updated_at: now,
        },
    );

    let broadcast = LocationBroadcast {
        booking_id: report.booking_id,
        vehicle_id,
        user_id,
        position,
        distance_to_dropoff_km: remaining_km(&position, &dropoff),
        updated_at: now,
    };

    state
        .realtime
        .publish(Group::Admins, ServerEvent::LocationUpdate(broadcast.clone()));
    state
        .realtime
        .publish(Group::User(user_id), ServerEvent::LocationUpdate(broadcast.clone()));

    debug!(booking_id = %report.booking_id, "vehicle location updated");
    Ok(broadcast)
}

pub fn latest_location(state: &AppState, booking_id: Uuid) -> Option<VehicleLocation> {
    state
        .vehicle_locations
        .get(&booking_id)
        .map(|entry| entry.value().clone())
}
