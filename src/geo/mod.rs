use crate::models::location::{GeoPoint, Place};

const EARTH_RADIUS_KM: f64 = 6_371.0;

impl GeoPoint {
    /// Great-circle distance in kilometres.
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let (from_lat, to_lat) = (self.lat.to_radians(), other.lat.to_radians());
        let half_dlat = ((other.lat - self.lat).to_radians() / 2.0).sin();
        let half_dlng = ((other.lng - self.lng).to_radians() / 2.0).sin();

        let h = half_dlat.powi(2) + from_lat.cos() * to_lat.cos() * half_dlng.powi(2);
        2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
    }
}

/// Distance left to a pickup or dropoff spot, rounded to metres.
pub fn remaining_km(position: &GeoPoint, destination: &Place) -> f64 {
    (position.distance_km(&destination.coordinates) * 1_000.0).round() / 1_000.0
}
