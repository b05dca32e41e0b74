use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum HandoverStatus {
    PendingPickup,
    PickedUp,
    PendingDropoff,
    DroppedOff,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HandoverLeg {
    Pickup,
    Dropoff,
}

impl HandoverLeg {
    pub fn as_str(self) -> &'static str {
        match self {
            HandoverLeg::Pickup => "pickup",
            HandoverLeg::Dropoff => "dropoff",
        }
    }
}

/// An issued one-time code. The code itself never leaves the server in a
/// serialized record; it is only returned by the generate endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct OtpChallenge {
    #[serde(skip_serializing)]
    pub code: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub failed_attempts: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Handover {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub vehicle_id: Uuid,
    pub pickup_otp: Option<OtpChallenge>,
    pub pickup_verified: bool,
    pub pickup_time: Option<DateTime<Utc>>,
    pub dropoff_otp: Option<OtpChallenge>,
    pub dropoff_verified: bool,
    pub dropoff_time: Option<DateTime<Utc>>,
    pub status: HandoverStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Handover {
    pub fn new(booking_id: Uuid, user_id: Uuid, vehicle_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id,
            user_id,
            vehicle_id,
            pickup_otp: None,
            pickup_verified: false,
            pickup_time: None,
            dropoff_otp: None,
            dropoff_verified: false,
            dropoff_time: None,
            status: HandoverStatus::PendingPickup,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn challenge_mut(&mut self, leg: HandoverLeg) -> &mut Option<OtpChallenge> {
        match leg {
            HandoverLeg::Pickup => &mut self.pickup_otp,
            HandoverLeg::Dropoff => &mut self.dropoff_otp,
        }
    }
}
