use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Signup,
    Booking,
    Payment,
    Handover,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(user_id: Uuid, payload: &NotificationPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            kind: payload.kind,
            title: payload.title.clone(),
            message: payload.message.clone(),
            link: payload.link.clone(),
            is_read: false,
            created_at: Utc::now(),
        }
    }
}

/// What gets written for, and pushed to, each recipient.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NotificationPayload {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
}
