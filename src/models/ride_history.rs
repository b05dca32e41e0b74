use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::booking::Booking;
use crate::models::handover::Handover;
use crate::models::location::Place;

/// Snapshot of a finished rental. Built by value so later edits to the
/// booking or handover never reach it.
#[derive(Debug, Clone, Serialize)]
pub struct RideHistory {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub user_email: String,
    pub vehicle_id: Uuid,
    pub vehicle_name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub pickup_time: Option<DateTime<Utc>>,
    pub dropoff_time: Option<DateTime<Utc>>,
    pub total_amount: f64,
    pub duration_days: i64,
    pub pickup_location: Place,
    pub dropoff_location: Place,
    pub completed_at: DateTime<Utc>,
}

impl RideHistory {
    pub fn snapshot(booking: &Booking, handover: &Handover, completed_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id: booking.id,
            user_id: booking.user_id,
            user_name: booking.user_name.clone(),
            user_email: booking.user_email.clone(),
            vehicle_id: booking.vehicle_id,
            vehicle_name: booking.vehicle_name.clone(),
            start_date: booking.start_date,
            end_date: booking.end_date,
            pickup_time: handover.pickup_time,
            dropoff_time: handover.dropoff_time,
            total_amount: booking.total_amount,
            duration_days: booking.duration_days,
            pickup_location: booking.pickup_location.clone(),
            dropoff_location: booking.dropoff_location.clone(),
            completed_at,
        }
    }
}
