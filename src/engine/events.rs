use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;
use uuid::Uuid;

use crate::models::booking::BookingStatus;
use crate::state::AppState;

/// Facts published by request handlers. Notification and push work happens
/// in the dispatcher, never on the request path.
#[derive(Debug, Clone)]
pub enum DomainEvent {
    UserRegistered {
        user_id: Uuid,
        name: String,
        email: String,
    },
    BookingCreated {
        booking_id: Uuid,
        user_name: String,
        vehicle_name: String,
    },
    BookingStatusChanged {
        booking_id: Uuid,
        user_id: Uuid,
        vehicle_name: String,
        status: BookingStatus,
    },
    BookingPaid {
        booking_id: Uuid,
        user_name: String,
        amount: f64,
    },
    PickupVerified {
        booking_id: Uuid,
        user_id: Uuid,
    },
    DropoffVerified {
        booking_id: Uuid,
        user_id: Uuid,
    },
}

impl DomainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::UserRegistered { .. } => "user_registered",
            DomainEvent::BookingCreated { .. } => "booking_created",
            DomainEvent::BookingStatusChanged { .. } => "booking_status_changed",
            DomainEvent::BookingPaid { .. } => "booking_paid",
            DomainEvent::PickupVerified { .. } => "pickup_verified",
            DomainEvent::DropoffVerified { .. } => "dropoff_verified",
        }
    }
}

/// Best effort: a full or closed queue is logged and the event dropped.
pub fn publish(state: &AppState, event: DomainEvent) {
    let name = event.name();
    match state.events_tx.try_send(event) {
        Ok(()) => state.metrics.events_in_queue.inc(),
        Err(TrySendError::Full(_)) => {
            warn!(event = name, "event queue full; dropping event");
        }
        Err(TrySendError::Closed(_)) => {
            warn!(event = name, "event queue closed; dropping event");
        }
    }
}
