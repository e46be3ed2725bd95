use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    Json,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use super::schema::{ListNotificationsQuery, NotificationResponse, ReadAllResponse};
use super::service::current_rooms;
use crate::error::{AppError, Result};
use crate::extract::{AppPath, AppQuery};
use crate::modules::auth::extractor::{AuthUser, RequestMeta};
use crate::modules::auth::model::{Role, User};
use crate::modules::auth::schema::MessageResponse;
use crate::services::realtime::rooms_for;
use crate::AppState;

pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    AppQuery(query): AppQuery<ListNotificationsQuery>,
) -> Result<Json<Vec<NotificationResponse>>> {
    let rows = state
        .store
        .list_notifications(user.id(), query.unread)
        .await?;

    Ok(Json(rows.into_iter().map(NotificationResponse::from).collect()))
}

pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    AppPath(id): AppPath<String>,
) -> Result<Json<MessageResponse>> {
    if !state.store.mark_notification_read(&id, user.id()).await? {
        return Err(AppError::NotFound("Notification"));
    }
    Ok(Json(MessageResponse::new("Notification marked as read")))
}

pub async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<ReadAllResponse>> {
    let updated = state.store.mark_all_notifications_read(user.id()).await?;
    Ok(Json(ReadAllResponse { updated }))
}

// =============================================================================
// REAL-TIME CHANNEL
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: String,
}

/// GET /ws?token={access token}
pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    meta: RequestMeta,
    AppQuery(query): AppQuery<WsQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response> {
    let user = state
        .sessions()
        .authenticate(&query.token)
        .await
        .inspect_err(|e| {
            tracing::warn!(
                ip = %meta.ip,
                method = %meta.method,
                url = "/ws",
                code = e.error_code(),
                "websocket authentication failed"
            );
        })?;

    Ok(ws.on_upgrade(move |socket| handle_connection(state, user, socket)))
}

/// Room membership is re-read from the store whenever a message could be
/// addressed to this connection, so role changes apply without reconnecting
/// and a deleted account is disconnected.
async fn handle_connection(state: Arc<AppState>, user: User, socket: WebSocket) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let reachable = rooms_for(&user.id, true);
    let mut rooms = rooms_for(&user.id, user.role == Role::SuperAdmin);
    let mut updates = state.realtime.subscribe();

    tracing::info!(user_id = %user.id, "websocket connected");

    let user_id = user.id.clone();
    let outbound_task = tokio::spawn(async move {
        loop {
            let message = match updates.recv().await {
                Ok(message) => message,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(user_id = %user_id, skipped, "websocket subscriber lagged");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            if !reachable.contains(&message.room) {
                continue;
            }
            match current_rooms(state.store.as_ref(), &user_id).await {
                Ok(Some(current)) => rooms = current,
                Ok(None) => {
                    tracing::info!(user_id = %user_id, "account gone, closing websocket");
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
                Err(e) => {
                    tracing::warn!(user_id = %user_id, error = %e, "room refresh failed, keeping previous rooms");
                }
            }
            if !rooms.contains(&message.room) {
                continue;
            }
            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(error = %e, "failed to encode realtime message");
                    continue;
                }
            };
            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // Inbound frames carry nothing; drain until the client goes away.
    while let Some(result) = ws_rx.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "websocket error");
                break;
            }
        }
    }

    outbound_task.abort();
    tracing::info!(user_id = %user.id, "websocket closed");
}
