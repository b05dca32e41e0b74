use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStatus {
    Open,
    Complete,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub status: CheckoutStatus,
    pub amount_total: Option<f64>,
    pub booking_id: Option<Uuid>,
}

/// Hosted checkout provider. Failures are `AppError::Upstream`.
#[async_trait]
pub trait CheckoutProvider: Send + Sync {
    async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession, AppError>;
}

pub struct UnconfiguredCheckout;

#[async_trait]
impl CheckoutProvider for UnconfiguredCheckout {
    async fn retrieve_session(&self, session_id: &str) -> Result<CheckoutSession, AppError> {
        Err(AppError::Upstream(format!(
            "no checkout provider configured to look up session {session_id}"
        )))
    }
}
