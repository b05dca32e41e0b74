use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use dashmap::DashSet;
use futures::SinkExt;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, warn};

use crate::engine::{chat, tracking};
use crate::error::{AppError, AppResult};
use crate::realtime::protocol::{ClientEvent, ServerEvent};
use crate::realtime::Group;
use crate::state::AppState;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut hub = BroadcastStream::new(state.realtime.subscribe());
    let groups: Arc<DashSet<Group>> = Arc::new(DashSet::new());
    let (reply_tx, mut reply_rx) = mpsc::channel::<ServerEvent>(32);

    state.metrics.realtime_connections.inc();
    info!("websocket client connected");

    let joined = groups.clone();
    let send_task = tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                next = hub.next() => match next {
                    Some(Ok(envelope)) => {
                        if !joined.contains(&envelope.group) {
                            continue;
                        }
                        envelope.event
                    }
                    Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                        warn!(skipped, "websocket client lagging; events skipped");
                        continue;
                    }
                    None => break,
                },
                reply = reply_rx.recv() => match reply {
                    Some(event) => event,
                    None => break,
                },
            };

            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize realtime event");
                    continue;
                }
            };

            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_state = state.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            let text = match message {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };

            let outcome = serde_json::from_str::<ClientEvent>(&text)
                .map_err(|err| AppError::Validation(format!("unrecognised event: {err}")))
                .and_then(|event| handle_client_event(&recv_state, &groups, event));

            if let Err(err) = outcome {
                debug!(error = %err, "realtime event rejected");
                let reply = ServerEvent::Error {
                    message: err.to_string(),
                };
                if reply_tx.send(reply).await.is_err() {
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    state.metrics.realtime_connections.dec();
    info!("websocket client disconnected");
}

fn handle_client_event(
    state: &AppState,
    groups: &DashSet<Group>,
    event: ClientEvent,
) -> AppResult<()> {
    match event {
        ClientEvent::Join { user_id } => {
            if !state.users.contains_key(&user_id) {
                return Err(AppError::NotFound(format!("user {user_id} not found")));
            }
            groups.insert(Group::User(user_id));
            debug!(user_id = %user_id, "socket joined user group");
        }
        ClientEvent::JoinAdmin => {
            groups.insert(Group::Admins);
            debug!("socket joined admin group");
        }
        ClientEvent::SendMessage(outgoing) => {
            chat::send_message(state, outgoing)?;
        }
        ClientEvent::UpdateLocation(report) => {
            tracking::record_location(state, report)?;
        }
    }
    Ok(())
}
