use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::chat::ChatMessage;
use crate::models::location::GeoPoint;
use crate::models::notification::Notification;

/// Frames a client sends: `{"event": "...", "data": {...}}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    Join { user_id: Uuid },
    JoinAdmin,
    SendMessage(OutgoingMessage),
    UpdateLocation(LocationReport),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    ReceiveMessage(ChatMessage),
    LocationUpdate(LocationBroadcast),
    Notification(Notification),
    Error { message: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutgoingMessage {
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationReport {
    pub booking_id: Uuid,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocationBroadcast {
    pub booking_id: Uuid,
    pub vehicle_id: Uuid,
    pub user_id: Uuid,
    pub position: GeoPoint,
    pub distance_to_dropoff_km: f64,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ClientEvent, ServerEvent};

    #[test]
    fn parses_join_admin_without_data() {
        let event: ClientEvent = serde_json::from_value(json!({ "event": "joinAdmin" })).unwrap();
        assert!(matches!(event, ClientEvent::JoinAdmin));
    }

    #[test]
    fn parses_update_location() {
        let event: ClientEvent = serde_json::from_value(json!({
            "event": "updateLocation",
            "data": {
                "booking_id": "00000000-0000-0000-0000-000000000001",
                "lat": 52.52,
                "lng": 13.405
            }
        }))
        .unwrap();

        match event {
            ClientEvent::UpdateLocation(report) => assert_eq!(report.lat, 52.52),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn server_events_use_event_and_data_keys() {
        let frame = serde_json::to_value(ServerEvent::Error {
            message: "nope".to_string(),
        })
        .unwrap();

        assert_eq!(frame["event"], "error");
        assert_eq!(frame["data"]["message"], "nope");
    }
}
