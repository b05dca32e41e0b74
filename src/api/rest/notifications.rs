use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch};
use axum::Json;
use axum::Router;
use uuid::Uuid;

use crate::engine::notifier;
use crate::error::AppError;
use crate::models::notification::Notification;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/notifications/user/:user_id", get(user_notifications))
        .route("/notifications/admin", get(admin_notifications))
        .route("/notifications/:id/read", patch(mark_read))
}

async fn user_notifications(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Json<Vec<Notification>> {
    Json(notifier::notifications_for_user(&state, user_id))
}

async fn admin_notifications(State(state): State<Arc<AppState>>) -> Json<Vec<Notification>> {
    Json(notifier::notifications_for_admins(&state))
}

async fn mark_read(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Notification>, AppError> {
    notifier::mark_read(&state, id).map(Json)
}
