//! Pickup and dropoff of the physical vehicle, each gated by a one-time code
//! the renter relays to staff in person.
//!
//! A handover moves `pending_pickup -> picked_up -> pending_dropoff ->
//! dropped_off` and never backwards. A verified code is cleared on the spot
//! so it cannot be replayed. Dropoff verification finishes the rental via
//! [`complete_ride`](crate::engine::completion::complete_ride).

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::engine::completion::complete_ride;
use crate::engine::events::{publish, DomainEvent};
use crate::engine::otp::OtpCheck;
use crate::error::{AppError, AppResult};
use crate::models::booking::BookingStatus;
use crate::models::handover::{Handover, HandoverLeg, HandoverStatus};
use crate::state::AppState;

pub fn generate_pickup_otp(state: &AppState, booking_id: Uuid) -> AppResult<String> {
    let booking = state
        .bookings
        .get(&booking_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id} not found")))?;

    if matches!(
        booking.status,
        BookingStatus::Denied | BookingStatus::Cancelled | BookingStatus::Completed
    ) {
        return Err(AppError::InvalidState(format!(
            "booking is {}, no pickup is possible",
            booking.status.as_str()
        )));
    }

    let now = Utc::now();
    let mut handover = state
        .handovers
        .entry(booking_id)
        .or_insert_with(|| Handover::new(booking_id, booking.user_id, booking.vehicle_id, now));

    if handover.pickup_verified {
        return Err(AppError::InvalidState(
            "car has already been picked up".to_string(),
        ));
    }

    let challenge = state.otp_policy.issue(now);
    let code = challenge.code.clone();
    handover.pickup_otp = Some(challenge);
    handover.updated_at = now;

    info!(booking_id = %booking_id, "pickup otp issued");
    Ok(code)
}

pub fn verify_pickup_otp(state: &AppState, booking_id: Uuid, submitted: &str) -> AppResult<Handover> {
    // Lock order is bookings then handovers, same as `cancel_booking`, so a
    // cancellation cannot slip in between the status check and the pickup.
    let (handover, user_id) = {
        let booking = state
            .bookings
            .get(&booking_id)
            .ok_or_else(|| AppError::NotFound(format!("booking {booking_id} not found")))?;
        let mut handover = state.handovers.get_mut(&booking_id).ok_or_else(|| {
            AppError::NotFound(format!("no handover found for booking {booking_id}"))
        })?;

        if booking.status != BookingStatus::Approved {
            return Err(AppError::InvalidState(format!(
                "booking is {}, it must be approved before pickup",
                booking.status.as_str()
            )));
        }

        redeem(state, &mut handover, HandoverLeg::Pickup, submitted)?;

        let now = Utc::now();
        handover.pickup_verified = true;
        handover.pickup_time = Some(now);
        handover.status = HandoverStatus::PickedUp;
        handover.updated_at = now;
        (handover.clone(), handover.user_id)
    };

    info!(booking_id = %booking_id, "pickup verified");
    publish(state, DomainEvent::PickupVerified { booking_id, user_id });

    Ok(handover)
}

pub fn generate_dropoff_otp(state: &AppState, booking_id: Uuid) -> AppResult<String> {
    let mut handover = state
        .handovers
        .get_mut(&booking_id)
        .ok_or_else(|| AppError::NotFound(format!("no handover found for booking {booking_id}")))?;

    let now = Utc::now();
    match handover.status {
        HandoverStatus::PickedUp => {}
        HandoverStatus::PendingDropoff => {
            let live = handover
                .dropoff_otp
                .as_ref()
                .is_some_and(|challenge| state.otp_policy.is_live(challenge, now));
            if live {
                return Err(AppError::InvalidState(
                    "a dropoff OTP is already active for this booking".to_string(),
                ));
            }
        }
        HandoverStatus::PendingPickup => {
            return Err(AppError::InvalidState(
                "car must be picked up before dropoff".to_string(),
            ));
        }
        HandoverStatus::DroppedOff => {
            return Err(AppError::InvalidState(
                "car has already been dropped off".to_string(),
            ));
        }
    }

    let challenge = state.otp_policy.issue(now);
    let code = challenge.code.clone();
    handover.dropoff_otp = Some(challenge);
    handover.status = HandoverStatus::PendingDropoff;
    handover.updated_at = now;

    info!(booking_id = %booking_id, "dropoff otp issued");
    Ok(code)
}

pub fn verify_dropoff_otp(
    state: &AppState,
    booking_id: Uuid,
    submitted: &str,
) -> AppResult<Handover> {
    let (handover, user_id) = {
        let mut handover = state.handovers.get_mut(&booking_id).ok_or_else(|| {
            AppError::NotFound(format!("no handover found for booking {booking_id}"))
        })?;

        if handover.status != HandoverStatus::PendingDropoff {
            return Err(AppError::InvalidOtp(
                "no dropoff OTP is awaiting verification".to_string(),
            ));
        }

        redeem(state, &mut handover, HandoverLeg::Dropoff, submitted)?;

        let now = Utc::now();
        handover.dropoff_verified = true;
        handover.dropoff_time = Some(now);
        handover.status = HandoverStatus::DroppedOff;
        handover.updated_at = now;
        (handover.clone(), handover.user_id)
    };

    info!(booking_id = %booking_id, "dropoff verified");

    // The dispatcher re-runs completion for this event, so a failure below
    // is finished there.
    publish(state, DomainEvent::DropoffVerified { booking_id, user_id });

    if let Err(err) = complete_ride(state, booking_id) {
        error!(booking_id = %booking_id, error = %err, "ride completion failed after dropoff");
    }

    Ok(handover)
}

pub fn handover_status(state: &AppState, booking_id: Uuid) -> Option<Handover> {
    state
        .handovers
        .get(&booking_id)
        .map(|entry| entry.value().clone())
}

/// Checks the submitted code for `leg` and clears it on success. Any failure
/// leaves the verified flag and status untouched.
fn redeem(
    state: &AppState,
    handover: &mut Handover,
    leg: HandoverLeg,
    submitted: &str,
) -> AppResult<()> {
    let now = Utc::now();
    let policy = state.otp_policy;
    let booking_id = handover.booking_id;
    let slot = handover.challenge_mut(leg);

    let Some(challenge) = slot.as_mut() else {
        record(state, leg, "missing");
        return Err(AppError::InvalidOtp(format!(
            "no {} OTP has been issued for this booking",
            leg.as_str()
        )));
    };

    let check = policy.check(challenge, submitted, now);
    record(state, leg, check.outcome_label());

    match check {
        OtpCheck::Accepted => {
            *slot = None;
            Ok(())
        }
        OtpCheck::Rejected { attempts_left } => {
            warn!(booking_id = %booking_id, leg = leg.as_str(), attempts_left, "otp mismatch");
            if attempts_left == 0 {
                Err(AppError::InvalidOtp(format!(
                    "invalid {} OTP; no attempts left, generate a new code",
                    leg.as_str()
                )))
            } else {
                Err(AppError::InvalidOtp(format!(
                    "invalid {} OTP, {attempts_left} attempts left",
                    leg.as_str()
                )))
            }
        }
        OtpCheck::Expired => Err(AppError::InvalidOtp(format!(
            "{} OTP has expired, generate a new code",
            leg.as_str()
        ))),
        OtpCheck::Exhausted => Err(AppError::InvalidOtp(format!(
            "too many failed attempts for {} OTP, generate a new code",
            leg.as_str()
        ))),
    }
}

fn record(state: &AppState, leg: HandoverLeg, outcome: &str) {
    state
        .metrics
        .otp_verifications_total
        .with_label_values(&[leg.as_str(), outcome])
        .inc();
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;
    use std::thread;

    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::{generate_pickup_otp, verify_pickup_otp};
    use crate::config::Config;
    use crate::engine::accounts::register_user;
    use crate::engine::booking::{cancel_booking, create_booking, set_status, NewBooking};
    use crate::models::booking::BookingStatus;
    use crate::models::handover::HandoverStatus;
    use crate::models::location::{GeoPoint, Place};
    use crate::models::user::Role;
    use crate::models::vehicle::Vehicle;
    use crate::state::AppState;

    fn depot() -> Place {
        Place {
            address: "Depot".to_string(),
            coordinates: GeoPoint { lat: 28.61, lng: 77.21 },
        }
    }

    fn approved_booking(state: &AppState, round: usize) -> Uuid {
        let user = register_user(state, "Ria", &format!("ria{round}@example.com"), Role::User)
            .unwrap();
        let now = Utc::now();
        let vehicle = Vehicle {
            id: Uuid::new_v4(),
            name: "Polo".to_string(),
            brand: "VW".to_string(),
            daily_rate: 30.0,
            seats: 5,
            available: true,
            created_at: now,
            updated_at: now,
        };
        let vehicle_id = vehicle.id;
        state.vehicles.insert(vehicle_id, vehicle);

        let booking = create_booking(
            state,
            NewBooking {
                vehicle_id,
                user_id: user.id,
                start_date: now + Duration::days(1),
                end_date: now + Duration::days(2),
                pickup_location: depot(),
                dropoff_location: depot(),
            },
        )
        .unwrap();
        set_status(state, booking.id, BookingStatus::Approved).unwrap();
        booking.id
    }

    #[test]
    fn cancel_and_pickup_never_both_win() {
        let (state, _rx) = AppState::new(&Config {
            event_queue_size: 4_096,
            ..Config::default()
        });

        for round in 0..200 {
            let booking_id = approved_booking(&state, round);
            let code = generate_pickup_otp(&state, booking_id).unwrap();
            let barrier = Barrier::new(2);

            let (cancelled, picked_up) = thread::scope(|scope| {
                let cancel = scope.spawn(|| {
                    barrier.wait();
                    cancel_booking(&state, booking_id).is_ok()
                });
                let pickup = scope.spawn(|| {
                    barrier.wait();
                    verify_pickup_otp(&state, booking_id, &code).is_ok()
                });
                (cancel.join().unwrap(), pickup.join().unwrap())
            });

            assert!(cancelled ^ picked_up, "round {round}: exactly one must succeed");
            let status = state.bookings.get(&booking_id).unwrap().status;
            let handover = state.handovers.get(&booking_id).unwrap().status;
            if cancelled {
                assert_eq!(status, BookingStatus::Cancelled);
                assert_eq!(handover, HandoverStatus::PendingPickup);
            } else {
                assert_eq!(status, BookingStatus::Approved);
                assert_eq!(handover, HandoverStatus::PickedUp);
            }
        }
    }
}
