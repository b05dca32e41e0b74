use chrono::Utc;
use dashmap::mapref::entry::Entry;
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::booking::BookingStatus;
use crate::models::handover::HandoverStatus;
use crate::models::ride_history::RideHistory;
use crate::state::AppState;

/// Finishes a rental whose dropoff was verified: booking to `completed`,
/// plus exactly one ride-history snapshot. Safe to repeat; each step is
/// skipped when already applied.
pub fn complete_ride(state: &AppState, booking_id: Uuid) -> AppResult<RideHistory> {
    let handover = state
        .handovers
        .get(&booking_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("no handover found for booking {booking_id}")))?;

    if handover.status != HandoverStatus::DroppedOff {
        return Err(AppError::InvalidState(
            "car has not been dropped off yet".to_string(),
        ));
    }

    let now = Utc::now();
    let booking = {
        let mut booking = state
            .bookings
            .get_mut(&booking_id)
            .ok_or_else(|| AppError::NotFound(format!("booking {booking_id} not found")))?;

        if matches!(booking.status, BookingStatus::Denied | BookingStatus::Cancelled) {
            return Err(AppError::InvalidState(format!(
                "a {} booking cannot be completed",
                booking.status.as_str()
            )));
        }
        if booking.status != BookingStatus::Completed {
            booking.status = BookingStatus::Completed;
            booking.updated_at = now;
            info!(booking_id = %booking_id, "booking completed");
        }
        booking.clone()
    };

    let history = match state.ride_history.entry(booking_id) {
        Entry::Occupied(existing) => existing.get().clone(),
        Entry::Vacant(slot) => {
            let history = RideHistory::snapshot(&booking, &handover, now);
            slot.insert(history.clone());
            info!(booking_id = %booking_id, ride_id = %history.id, "ride history recorded");
            history
        }
    };

    Ok(history)
}

pub fn history_for_user(state: &AppState, user_id: Uuid) -> Vec<RideHistory> {
    let mut rides: Vec<RideHistory> = state
        .ride_history
        .iter()
        .filter(|entry| entry.value().user_id == user_id)
        .map(|entry| entry.value().clone())
        .collect();
    rides.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
    rides
}

pub fn all_history(state: &AppState) -> Vec<RideHistory> {
    let mut rides: Vec<RideHistory> = state
        .ride_history
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    rides.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
    rides
}
