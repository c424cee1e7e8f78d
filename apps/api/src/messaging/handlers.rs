use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::messaging::store::{self, MessageStats};
use crate::models::message::{ConversationRow, MessageRow};
use crate::models::notification::NotificationKind;
use crate::notifications::service::notify_quietly;
use crate::notifications::store::NewNotification;
use crate::offers;
use crate::pagination::{PageQuery, Paginated};
use crate::realtime::hub::{UserEvent, EVENT_MESSAGE_NEW};
use crate::state::AppState;
use crate::users;

const MAX_MESSAGE_LEN: usize = 5_000;
const PREVIEW_LEN: usize = 80;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub recipient_id: Uuid,
    pub content: String,
    #[serde(default)]
    pub offer_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ThreadQuery {
    pub offer_id: Option<Uuid>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// POST /api/messages
pub async fn handle_send(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageRow>), AppError> {
    let content = req.content.trim();
    if content.is_empty() {
        return Err(AppError::Validation("message content cannot be empty".into()));
    }
    if content.chars().count() > MAX_MESSAGE_LEN {
        return Err(AppError::Validation(format!(
            "message content cannot exceed {MAX_MESSAGE_LEN} characters"
        )));
    }
    if req.recipient_id == auth.id {
        return Err(AppError::Validation("cannot send a message to yourself".into()));
    }
    if !users::store::exists(&state.db, req.recipient_id).await? {
        return Err(AppError::NotFound("recipient not found".into()));
    }
    if let Some(offer_id) = req.offer_id {
        if offers::store::find_offer(&state.db, offer_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Offer {offer_id} not found")));
        }
    }

    let message = store::insert(&state.db, auth.id, req.recipient_id, req.offer_id, content).await?;

    match serde_json::to_value(&message) {
        Ok(data) => {
            state
                .hub
                .publish(UserEvent::new(message.recipient_id, EVENT_MESSAGE_NEW, data))
                .await
        }
        Err(e) => tracing::warn!("Failed to encode message {}: {e}", message.id),
    }

    notify_quietly(
        &state.db,
        &state.hub,
        NewNotification {
            user_id: message.recipient_id,
            sender_id: Some(auth.id),
            title: "New message".to_string(),
            message: preview(content),
            kind: NotificationKind::NewMessage,
            offer_id: message.offer_id,
            data: serde_json::json!({ "message_id": message.id }),
        },
    )
    .await;

    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /api/messages/conversations
pub async fn handle_conversations(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<ConversationRow>>, AppError> {
    let page = query.validate()?;
    let (rows, total) = store::conversations(&state.db, auth.id, page).await?;
    Ok(Json(Paginated::new(rows, page, total)))
}

/// GET /api/messages/conversations/:peer_id
/// Reading a thread marks the caller's received messages in it as read.
pub async fn handle_thread(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(peer_id): Path<Uuid>,
    Query(query): Query<ThreadQuery>,
) -> Result<Json<Paginated<MessageRow>>, AppError> {
    let page = PageQuery {
        page: query.page,
        limit: query.limit,
    }
    .validate()?;

    let (rows, total) = store::thread(&state.db, auth.id, peer_id, query.offer_id, page).await?;
    store::mark_thread_read(&state.db, auth.id, peer_id, query.offer_id).await?;
    Ok(Json(Paginated::new(rows, page, total)))
}

/// PUT /api/messages/:id/read
pub async fn handle_mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageRow>, AppError> {
    let message = store::find(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Message {id} not found")))?;
    if message.recipient_id != auth.id {
        return Err(AppError::Forbidden);
    }
    Ok(Json(store::mark_read(&state.db, id).await?))
}

/// GET /api/messages/stats
pub async fn handle_stats(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<MessageStats>, AppError> {
    Ok(Json(store::stats(&state.db, auth.id).await?))
}

fn preview(content: &str) -> String {
    if content.chars().count() <= PREVIEW_LEN {
        content.to_string()
    } else {
        let cut: String = content.chars().take(PREVIEW_LEN).collect();
        format!("{cut}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        assert_eq!(preview("short"), "short");
        let long = "é".repeat(100);
        let p = preview(&long);
        assert_eq!(p.chars().count(), PREVIEW_LEN + 1);
        assert!(p.ends_with('…'));
    }
}
