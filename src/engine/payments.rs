use tracing::info;
use uuid::Uuid;

use crate::clients::checkout::CheckoutStatus;
use crate::engine::booking::{mark_paid, PaidOutcome, PaymentReceipt};
use crate::error::{AppError, AppResult};
use crate::models::payment::{Payment, PaymentMethod};
use crate::state::AppState;

/// Confirms a hosted checkout session and marks the booking paid. Provider
/// failures propagate: here the payment is the primary effect.
pub async fn verify_checkout(
    state: &AppState,
    booking_id: Uuid,
    session_id: &str,
) -> AppResult<PaidOutcome> {
    if session_id.trim().is_empty() {
        return Err(AppError::Validation("session_id cannot be empty".to_string()));
    }
    if !state.bookings.contains_key(&booking_id) {
        return Err(AppError::NotFound(format!("booking {booking_id} not found")));
    }

    let session = state.checkout.retrieve_session(session_id).await?;

    if let Some(session_booking) = session.booking_id {
        if session_booking != booking_id {
            return Err(AppError::Validation(
                "checkout session belongs to a different booking".to_string(),
            ));
        }
    }
    if session.status != CheckoutStatus::Complete {
        return Err(AppError::InvalidState(format!(
            "checkout session {} is not complete",
            session.id
        )));
    }

    info!(booking_id = %booking_id, session_id = %session.id, "checkout session confirmed");
    mark_paid(
        state,
        booking_id,
        PaymentReceipt {
            method: PaymentMethod::Checkout,
            amount: session.amount_total,
            reference: Some(session.id),
        },
    )
}

pub fn list_payments(state: &AppState) -> Vec<Payment> {
    let mut payments: Vec<Payment> = state
        .payments
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    payments
}
