use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use uuid::Uuid;

use crate::engine::chat;
use crate::error::AppError;
use crate::models::chat::ChatMessage;
use crate::realtime::protocol::OutgoingMessage;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/chat/messages", post(send_message))
        .route("/chat/:user_a/:user_b", get(conversation))
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<OutgoingMessage>,
) -> Result<(StatusCode, Json<ChatMessage>), AppError> {
    let message = chat::send_message(&state, payload)?;
    Ok((StatusCode::CREATED, Json(message)))
}

async fn conversation(
    State(state): State<Arc<AppState>>,
    Path((user_a, user_b)): Path<(Uuid, Uuid)>,
) -> Json<Vec<ChatMessage>> {
    Json(chat::conversation(&state, user_a, user_b))
}
