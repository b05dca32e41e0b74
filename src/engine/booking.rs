use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::engine::events::{publish, DomainEvent};
use crate::error::{AppError, AppResult};
use crate::models::booking::{Booking, BookingStatus};
use crate::models::handover::HandoverStatus;
use crate::models::location::Place;
use crate::models::payment::{Payment, PaymentMethod};
use crate::state::AppState;

const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub vehicle_id: Uuid,
    pub user_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub pickup_location: Place,
    pub dropoff_location: Place,
}

#[derive(Debug, Clone)]
pub struct PaymentReceipt {
    pub method: PaymentMethod,
    pub amount: Option<f64>,
    pub reference: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PaidOutcome {
    pub booking: Booking,
    pub already_paid: bool,
}

/// Whole days billed for a rental, any started day counts.
pub fn rental_days(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let seconds = (end - start).num_seconds().max(0);
    (seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY
}

/// Inclusive on both ends: a booking ending on the day another starts
/// still collides.
pub fn ranges_overlap(
    existing_start: DateTime<Utc>,
    existing_end: DateTime<Utc>,
    new_start: DateTime<Utc>,
    new_end: DateTime<Utc>,
) -> bool {
    existing_start <= new_end && existing_end >= new_start
}

fn round_currency(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

fn validate_place(label: &str, place: &Place) -> AppResult<()> {
    if place.address.trim().is_empty() {
        return Err(AppError::Validation(format!("{label} address cannot be empty")));
    }
    if !place.coordinates.is_valid() {
        return Err(AppError::Validation(format!(
            "{label} coordinates are out of range"
        )));
    }
    Ok(())
}

pub fn create_booking(state: &AppState, request: NewBooking) -> AppResult<Booking> {
    let result = insert_booking(state, request);
    let outcome = match &result {
        Ok(_) => "created",
        Err(AppError::NotFound(_)) => "not_found",
        Err(_) => "rejected",
    };
    state.metrics.bookings_total.with_label_values(&[outcome]).inc();
    result
}

fn insert_booking(state: &AppState, request: NewBooking) -> AppResult<Booking> {
    if request.start_date >= request.end_date {
        return Err(AppError::Validation(
            "end date must be after start date".to_string(),
        ));
    }
    validate_place("pickup", &request.pickup_location)?;
    validate_place("dropoff", &request.dropoff_location)?;

    let user = state
        .users
        .get(&request.user_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("user {} not found", request.user_id)))?;

    // The vehicle guard serializes concurrent requests for the same vehicle
    // across the overlap scan and the insert.
    let vehicle = state
        .vehicles
        .get_mut(&request.vehicle_id)
        .ok_or_else(|| AppError::NotFound(format!("vehicle {} not found", request.vehicle_id)))?;

    if !vehicle.available {
        return Err(AppError::Validation(format!(
            "{} is not available for booking",
            vehicle.name
        )));
    }

    let clash = state.bookings.iter().any(|entry| {
        let existing = entry.value();
        existing.vehicle_id == request.vehicle_id
            && existing.status.blocks_vehicle()
            && ranges_overlap(
                existing.start_date,
                existing.end_date,
                request.start_date,
                request.end_date,
            )
    });
    if clash {
        return Err(AppError::Validation(
            "vehicle is already booked for the selected dates".to_string(),
        ));
    }

    let duration_days = rental_days(request.start_date, request.end_date);
    let now = Utc::now();
    let booking = Booking {
        id: Uuid::new_v4(),
        vehicle_id: vehicle.id,
        user_id: user.id,
        user_name: user.name,
        user_email: user.email,
        vehicle_name: vehicle.name.clone(),
        start_date: request.start_date,
        end_date: request.end_date,
        duration_days,
        total_amount: round_currency(duration_days as f64 * vehicle.daily_rate),
        status: BookingStatus::Pending,
        paid: false,
        pickup_location: request.pickup_location,
        dropoff_location: request.dropoff_location,
        created_at: now,
        updated_at: now,
    };

    state.bookings.insert(booking.id, booking.clone());
    drop(vehicle);

    info!(
        booking_id = %booking.id,
        vehicle_id = %booking.vehicle_id,
        duration_days,
        total_amount = booking.total_amount,
        "booking created"
    );

    publish(
        state,
        DomainEvent::BookingCreated {
            booking_id: booking.id,
            user_name: booking.user_name.clone(),
            vehicle_name: booking.vehicle_name.clone(),
        },
    );

    Ok(booking)
}

/// Admin decision on a pending booking. Completion is driven by the handover
/// flow and cancellation by `cancel_booking`, never through here.
pub fn set_status(state: &AppState, booking_id: Uuid, status: BookingStatus) -> AppResult<Booking> {
    if !matches!(status, BookingStatus::Approved | BookingStatus::Denied) {
        return Err(AppError::Validation(format!(
            "status can only be set to approved or denied, got {}",
            status.as_str()
        )));
    }

    let updated = {
        let mut booking = state
            .bookings
            .get_mut(&booking_id)
            .ok_or_else(|| AppError::NotFound(format!("booking {booking_id} not found")))?;

        if booking.status != BookingStatus::Pending {
            return Err(AppError::InvalidState(format!(
                "booking is {} and can no longer be {}",
                booking.status.as_str(),
                status.as_str()
            )));
        }

        booking.status = status;
        booking.updated_at = Utc::now();
        booking.clone()
    };

    info!(booking_id = %booking_id, status = status.as_str(), "booking status changed");
    publish(
        state,
        DomainEvent::BookingStatusChanged {
            booking_id,
            user_id: updated.user_id,
            vehicle_name: updated.vehicle_name.clone(),
            status,
        },
    );

    Ok(updated)
}

pub fn cancel_booking(state: &AppState, booking_id: Uuid) -> AppResult<Booking> {
    let updated = {
        let mut booking = state
            .bookings
            .get_mut(&booking_id)
            .ok_or_else(|| AppError::NotFound(format!("booking {booking_id} not found")))?;

        if booking.status != BookingStatus::Approved {
            return Err(AppError::InvalidState(format!(
                "only approved bookings can be cancelled, booking is {}",
                booking.status.as_str()
            )));
        }

        // Read under the booking guard; pickup verification takes the same
        // guard before touching the handover.
        let picked_up = state
            .handovers
            .get(&booking_id)
            .is_some_and(|handover| handover.status >= HandoverStatus::PickedUp);
        if picked_up {
            return Err(AppError::InvalidState(
                "car has already been picked up".to_string(),
            ));
        }

        booking.status = BookingStatus::Cancelled;
        booking.updated_at = Utc::now();
        booking.clone()
    };

    info!(booking_id = %booking_id, "booking cancelled");
    publish(
        state,
        DomainEvent::BookingStatusChanged {
            booking_id,
            user_id: updated.user_id,
            vehicle_name: updated.vehicle_name.clone(),
            status: BookingStatus::Cancelled,
        },
    );

    Ok(updated)
}

/// Idempotent: a booking that is already paid is returned untouched, with no
/// payment record and no event.
pub fn mark_paid(
    state: &AppState,
    booking_id: Uuid,
    receipt: PaymentReceipt,
) -> AppResult<PaidOutcome> {
    if let Some(amount) = receipt.amount {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(AppError::Validation(
                "payment amount must be a positive number".to_string(),
            ));
        }
    }

    let updated = {
        let mut booking = state
            .bookings
            .get_mut(&booking_id)
            .ok_or_else(|| AppError::NotFound(format!("booking {booking_id} not found")))?;

        if booking.paid {
            return Ok(PaidOutcome {
                booking: booking.clone(),
                already_paid: true,
            });
        }
        if matches!(booking.status, BookingStatus::Denied | BookingStatus::Cancelled) {
            return Err(AppError::InvalidState(format!(
                "a {} booking cannot be paid",
                booking.status.as_str()
            )));
        }

        booking.paid = true;
        booking.updated_at = Utc::now();
        booking.clone()
    };

    let payment = Payment {
        id: Uuid::new_v4(),
        booking_id,
        user_id: updated.user_id,
        amount: receipt.amount.unwrap_or(updated.total_amount),
        method: receipt.method,
        reference: receipt.reference,
        created_at: Utc::now(),
    };
    state.payments.insert(payment.id, payment.clone());

    info!(booking_id = %booking_id, amount = payment.amount, "booking marked paid");
    publish(
        state,
        DomainEvent::BookingPaid {
            booking_id,
            user_name: updated.user_name.clone(),
            amount: payment.amount,
        },
    );

    Ok(PaidOutcome {
        booking: updated,
        already_paid: false,
    })
}

pub fn list_bookings(state: &AppState) -> Vec<Booking> {
    let mut bookings: Vec<Booking> = state
        .bookings
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    bookings
}

pub fn bookings_for_user(state: &AppState, user_id: Uuid) -> Vec<Booking> {
    let mut bookings: Vec<Booking> = state
        .bookings
        .iter()
        .filter(|entry| entry.value().user_id == user_id)
        .map(|entry| entry.value().clone())
        .collect();
    bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    bookings
}
