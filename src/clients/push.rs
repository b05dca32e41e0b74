use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::models::notification::NotificationPayload;
use crate::models::user::PushSubscription;

#[derive(Debug, Error)]
pub enum PushError {
    #[error("push endpoint answered {0}")]
    Status(u16),

    #[error("push transport failed: {0}")]
    Transport(String),
}

impl PushError {
    /// The endpoint no longer exists and should be dropped from the user.
    pub fn is_gone(&self) -> bool {
        matches!(self, PushError::Status(404) | PushError::Status(410))
    }
}

#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn send(
        &self,
        subscription: &PushSubscription,
        payload: &NotificationPayload,
    ) -> Result<(), PushError>;
}

/// Default transport when no push gateway is wired in: records the delivery
/// in the log and reports success.
pub struct LoggingPushTransport;

#[async_trait]
impl PushTransport for LoggingPushTransport {
    async fn send(
        &self,
        subscription: &PushSubscription,
        payload: &NotificationPayload,
    ) -> Result<(), PushError> {
        debug!(endpoint = %subscription.endpoint, title = %payload.title, "push delivered");
        Ok(())
    }
}
