use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::notification::{Notification, NotificationPayload};
use crate::realtime::protocol::ServerEvent;
use crate::realtime::Group;
use crate::state::AppState;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    pub recipients: usize,
    pub delivered: usize,
    pub pruned: usize,
    pub failed: usize,
}

impl DeliveryReport {
    fn absorb(&mut self, other: DeliveryReport) {
        self.recipients += other.recipients;
        self.delivered += other.delivered;
        self.pruned += other.pruned;
        self.failed += other.failed;
    }
}

/// Stores the notification, relays it to the user's open sockets and pushes
/// it to every registered endpoint. Endpoints answering 404/410 are dropped
/// from the user; other push failures are only counted.
pub async fn notify_user(
    state: &AppState,
    user_id: Uuid,
    payload: &NotificationPayload,
) -> AppResult<DeliveryReport> {
    let subscriptions = state
        .users
        .get(&user_id)
        .map(|user| user.push_subscriptions.clone())
        .ok_or_else(|| AppError::NotFound(format!("user {user_id} not found")))?;

    let notification = Notification::new(user_id, payload);
    state
        .notifications
        .insert(notification.id, notification.clone());
    state
        .metrics
        .notifications_total
        .with_label_values(&["stored"])
        .inc();
    state
        .realtime
        .publish(Group::User(user_id), ServerEvent::Notification(notification));

    let mut report = DeliveryReport {
        recipients: 1,
        ..DeliveryReport::default()
    };
    let mut gone = Vec::new();

    for subscription in &subscriptions {
        let outcome = match state.push.send(subscription, payload).await {
            Ok(()) => {
                report.delivered += 1;
                "delivered"
            }
            Err(err) if err.is_gone() => {
                debug!(user_id = %user_id, endpoint = %subscription.endpoint, "push endpoint gone");
                gone.push(subscription.endpoint.clone());
                "pruned"
            }
            Err(err) => {
                warn!(user_id = %user_id, endpoint = %subscription.endpoint, error = %err, "push delivery failed");
                report.failed += 1;
                "failed"
            }
        };
        state
            .metrics
            .push_deliveries_total
            .with_label_values(&[outcome])
            .inc();
    }

    if !gone.is_empty() {
        if let Some(mut user) = state.users.get_mut(&user_id) {
            user.push_subscriptions
                .retain(|subscription| !gone.contains(&subscription.endpoint));
        }
        report.pruned = gone.len();
    }

    Ok(report)
}

/// Repeats `notify_user` for every admin independently; one admin failing
/// does not stop the others.
pub async fn notify_admins(state: &AppState, payload: &NotificationPayload) -> DeliveryReport {
    let mut total = DeliveryReport::default();

    for admin_id in state.admin_ids() {
        match notify_user(state, admin_id, payload).await {
            Ok(report) => total.absorb(report),
            Err(err) => {
                state
                    .metrics
                    .notifications_total
                    .with_label_values(&["failed"])
                    .inc();
                warn!(admin_id = %admin_id, error = %err, "admin notification failed");
            }
        }
    }

    total
}

pub fn notifications_for_user(state: &AppState, user_id: Uuid) -> Vec<Notification> {
    let mut notifications: Vec<Notification> = state
        .notifications
        .iter()
        .filter(|entry| entry.value().user_id == user_id)
        .map(|entry| entry.value().clone())
        .collect();
    notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    notifications
}

pub fn notifications_for_admins(state: &AppState) -> Vec<Notification> {
    let admins = state.admin_ids();
    let mut notifications: Vec<Notification> = state
        .notifications
        .iter()
        .filter(|entry| admins.contains(&entry.value().user_id))
        .map(|entry| entry.value().clone())
        .collect();
    notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    notifications
}

pub fn mark_read(state: &AppState, notification_id: Uuid) -> AppResult<Notification> {
    let mut notification = state
        .notifications
        .get_mut(&notification_id)
        .ok_or_else(|| AppError::NotFound(format!("notification {notification_id} not found")))?;

    notification.is_read = true;
    Ok(notification.clone())
}
