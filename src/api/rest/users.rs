use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::accounts;
use crate::error::AppError;
use crate::models::user::{PushSubscription, Role, User};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", post(create_user).get(list_users))
        .route("/users/:id", get(get_user))
        .route(
            "/users/:id/push-subscriptions",
            post(add_push_subscription).delete(remove_push_subscription),
        )
}

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Deserialize)]
pub struct RemoveSubscriptionRequest {
    pub endpoint: String,
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = accounts::register_user(&state, &payload.name, &payload.email, payload.role)?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn list_users(State(state): State<Arc<AppState>>) -> Json<Vec<User>> {
    let mut users: Vec<User> = state
        .users
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    Json(users)
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    let user = state
        .users
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("user {} not found", id)))?;

    Ok(Json(user.value().clone()))
}

async fn add_push_subscription(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PushSubscription>,
) -> Result<Json<User>, AppError> {
    accounts::add_push_subscription(&state, id, payload).map(Json)
}

async fn remove_push_subscription(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RemoveSubscriptionRequest>,
) -> Result<Json<User>, AppError> {
    accounts::remove_push_subscription(&state, id, &payload.endpoint).map(Json)
}
