use chrono::Utc;
use dashmap::mapref::entry::Entry;
use tracing::info;
use uuid::Uuid;

use crate::engine::events::{publish, DomainEvent};
use crate::error::{AppError, AppResult};
use crate::models::user::{PushSubscription, Role, User};
use crate::state::AppState;

pub fn register_user(state: &AppState, name: &str, email: &str, role: Role) -> AppResult<User> {
    let name = name.trim();
    let email = email.trim().to_lowercase();

    if name.is_empty() {
        return Err(AppError::Validation("name cannot be empty".to_string()));
    }
    if !email.contains('@') {
        return Err(AppError::Validation(format!("{email} is not a valid email")));
    }
    let user = match state.user_emails.entry(email.clone()) {
        Entry::Occupied(_) => {
            return Err(AppError::Conflict(format!("{email} is already registered")));
        }
        Entry::Vacant(slot) => {
            let user = User {
                id: Uuid::new_v4(),
                name: name.to_string(),
                email,
                role,
                push_subscriptions: Vec::new(),
                created_at: Utc::now(),
            };
            slot.insert(user.id);
            state.users.insert(user.id, user.clone());
            user
        }
    };

    info!(user_id = %user.id, role = ?user.role, "user registered");
    publish(
        state,
        DomainEvent::UserRegistered {
            user_id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        },
    );

    Ok(user)
}

pub fn find_by_email(state: &AppState, email: &str) -> Option<User> {
    let user_id = *state.user_emails.get(&email.trim().to_lowercase())?;
    state.users.get(&user_id).map(|entry| entry.value().clone())
}

/// Creates the configured admin account unless that email already exists.
pub fn seed_admin(state: &AppState, email: &str, name: &str) -> AppResult<Option<User>> {
    if find_by_email(state, email).is_some() {
        return Ok(None);
    }
    register_user(state, name, email, Role::Admin).map(Some)
}

pub fn add_push_subscription(
    state: &AppState,
    user_id: Uuid,
    subscription: PushSubscription,
) -> AppResult<User> {
    if subscription.endpoint.trim().is_empty() {
        return Err(AppError::Validation("endpoint cannot be empty".to_string()));
    }

    let mut user = state
        .users
        .get_mut(&user_id)
        .ok_or_else(|| AppError::NotFound(format!("user {user_id} not found")))?;

    let known = user
        .push_subscriptions
        .iter()
        .any(|existing| existing.endpoint == subscription.endpoint);
    if !known {
        user.push_subscriptions.push(subscription);
    }

    Ok(user.clone())
}

pub fn remove_push_subscription(state: &AppState, user_id: Uuid, endpoint: &str) -> AppResult<User> {
    let mut user = state
        .users
        .get_mut(&user_id)
        .ok_or_else(|| AppError::NotFound(format!("user {user_id} not found")))?;

    user.push_subscriptions
        .retain(|subscription| subscription.endpoint != endpoint);
    Ok(user.clone())
}
