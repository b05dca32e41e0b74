use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::chat::ChatMessage;
use crate::realtime::protocol::{OutgoingMessage, ServerEvent};
use crate::realtime::Group;
use crate::state::AppState;

const MAX_MESSAGE_LEN: usize = 2_000;

/// Persists the message first, then relays it to the receiver's sockets.
/// Messages to an admin go to every admin console instead.
pub fn send_message(state: &AppState, outgoing: OutgoingMessage) -> AppResult<ChatMessage> {
    let content = outgoing.content.trim();
    if content.is_empty() {
        return Err(AppError::Validation("message cannot be empty".to_string()));
    }
    if content.chars().count() > MAX_MESSAGE_LEN {
        return Err(AppError::Validation(format!(
            "message exceeds {MAX_MESSAGE_LEN} characters"
        )));
    }
    if !state.users.contains_key(&outgoing.sender_id) {
        return Err(AppError::NotFound(format!(
            "user {} not found",
            outgoing.sender_id
        )));
    }
    let receiver_is_admin = state
        .users
        .get(&outgoing.receiver_id)
        .map(|user| user.is_admin())
        .ok_or_else(|| AppError::NotFound(format!("user {} not found", outgoing.receiver_id)))?;

    let message = ChatMessage {
        id: Uuid::new_v4(),
        sender_id: outgoing.sender_id,
        receiver_id: outgoing.receiver_id,
        content: content.to_string(),
        created_at: Utc::now(),
    };
    state.chat_messages.insert(message.id, message.clone());

    // Admin sockets also join their own user group, so one envelope is enough.
    let group = if receiver_is_admin {
        Group::Admins
    } else {
        Group::User(message.receiver_id)
    };
    let seen = state
        .realtime
        .publish(group, ServerEvent::ReceiveMessage(message.clone()));

    debug!(message_id = %message.id, subscribers = seen, "chat message relayed");
    Ok(message)
}

/// Both directions between two users, oldest first.
pub fn conversation(state: &AppState, a: Uuid, b: Uuid) -> Vec<ChatMessage> {
    let mut messages: Vec<ChatMessage> = state
        .chat_messages
        .iter()
        .filter(|entry| {
            let m = entry.value();
            (m.sender_id == a && m.receiver_id == b) || (m.sender_id == b && m.receiver_id == a)
        })
        .map(|entry| entry.value().clone())
        .collect();
    messages.sort_by(|x, y| x.created_at.cmp(&y.created_at));
    messages
}
