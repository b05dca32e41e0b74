use std::sync::Arc;

use tower_http::services::ServeDir;
use tracing_subscriber::EnvFilter;

use car_rental_hub::api;
use car_rental_hub::config::{Config, LogFormat};
use car_rental_hub::engine::accounts::seed_admin;
use car_rental_hub::engine::dispatcher::run_event_dispatcher;
use car_rental_hub::error::AppError;
use car_rental_hub::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false);
    match config.log_format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Compact => subscriber.compact().init(),
    }

    let (app_state, events_rx) = AppState::new(&config);
    let shared_state = Arc::new(app_state);

    if let Some(email) = &config.admin_email {
        if let Some(admin) = seed_admin(&shared_state, email, &config.admin_name)? {
            tracing::info!(user_id = %admin.id, email = %admin.email, "admin account created");
        }
    }

    tokio::spawn(run_event_dispatcher(shared_state.clone(), events_rx));

    let app = api::rest::router(shared_state.clone())
        .fallback_service(ServeDir::new(&config.static_dir));

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
