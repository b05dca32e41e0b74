use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::engine::completion::complete_ride;
use crate::engine::events::DomainEvent;
use crate::engine::notifier::{notify_admins, notify_user};
use crate::error::AppResult;
use crate::models::notification::{NotificationKind, NotificationPayload};
use crate::state::AppState;

pub async fn run_event_dispatcher(
    state: Arc<AppState>,
    mut events_rx: mpsc::Receiver<DomainEvent>,
) {
    info!("event dispatcher started");

    while let Some(event) = events_rx.recv().await {
        state.metrics.events_in_queue.dec();

        let name = event.name();
        if let Err(err) = handle_event(&state, event).await {
            error!(event = name, error = %err, "failed to handle event");
        }
    }

    warn!("event dispatcher stopped: queue channel closed");
}

/// Applies the side effects of one event. The dispatcher loop calls this for
/// every queued event.
pub async fn handle_event(state: &AppState, event: DomainEvent) -> AppResult<()> {
    match event {
        DomainEvent::UserRegistered {
            user_id,
            name,
            email,
        } => {
            let payload = NotificationPayload {
                kind: NotificationKind::Signup,
                title: "New user registered".to_string(),
                message: format!("{name} ({email}) just signed up"),
                link: Some(format!("/admin/users/{user_id}")),
            };
            notify_admins(state, &payload).await;
        }
        DomainEvent::BookingCreated {
            booking_id,
            user_name,
            vehicle_name,
        } => {
            let payload = NotificationPayload {
                kind: NotificationKind::Booking,
                title: "New booking request".to_string(),
                message: format!("{user_name} requested {vehicle_name}"),
                link: Some(format!("/admin/bookings/{booking_id}")),
            };
            notify_admins(state, &payload).await;
        }
        DomainEvent::BookingStatusChanged {
            booking_id,
            user_id,
            vehicle_name,
            status,
        } => {
            let payload = NotificationPayload {
                kind: NotificationKind::Booking,
                title: format!("Booking {}", status.as_str()),
                message: format!(
                    "Your booking for {vehicle_name} has been {}",
                    status.as_str()
                ),
                link: Some(format!("/bookings/{booking_id}")),
            };
            notify_user(state, user_id, &payload).await?;
        }
        DomainEvent::BookingPaid {
            booking_id,
            user_name,
            amount,
        } => {
            let payload = NotificationPayload {
                kind: NotificationKind::Payment,
                title: "Payment received".to_string(),
                message: format!("{user_name} paid {amount:.2} for booking {booking_id}"),
                link: Some(format!("/admin/bookings/{booking_id}")),
            };
            notify_admins(state, &payload).await;
        }
        DomainEvent::PickupVerified {
            booking_id,
            user_id,
        } => {
            let payload = NotificationPayload {
                kind: NotificationKind::Handover,
                title: "Vehicle picked up".to_string(),
                message: format!("Pickup confirmed for booking {booking_id} (user {user_id})"),
                link: Some(format!("/admin/handover/{booking_id}")),
            };
            notify_admins(state, &payload).await;
        }
        DomainEvent::DropoffVerified {
            booking_id,
            user_id,
        } => {
            // Finishes a completion interrupted on the request path.
            let ride = complete_ride(state, booking_id)?;

            let user_payload = NotificationPayload {
                kind: NotificationKind::Handover,
                title: "Ride completed".to_string(),
                message: format!(
                    "Thanks for riding with {}. Total: {:.2}",
                    ride.vehicle_name, ride.total_amount
                ),
                link: Some("/history".to_string()),
            };
            notify_user(state, user_id, &user_payload).await?;

            let admin_payload = NotificationPayload {
                kind: NotificationKind::Handover,
                title: "Vehicle returned".to_string(),
                message: format!("{} returned {}", ride.user_name, ride.vehicle_name),
                link: Some(format!("/admin/handover/{booking_id}")),
            };
            notify_admins(state, &admin_payload).await;
        }
    }

    Ok(())
}
