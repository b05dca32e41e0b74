use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

/// A named pickup or dropoff spot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Place {
    pub address: String,
    pub coordinates: GeoPoint,
}

/// Latest reported position of the vehicle serving a booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleLocation {
    pub booking_id: Uuid,
    pub vehicle_id: Uuid,
    pub user_id: Uuid,
    pub position: GeoPoint,
    pub updated_at: DateTime<Utc>,
}
