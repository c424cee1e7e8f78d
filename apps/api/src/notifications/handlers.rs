use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::notification::NotificationRow;
use crate::notifications::store::{self, NotificationStats};
use crate::pagination::{PageMeta, PageQuery};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NotificationListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Serialize)]
pub struct NotificationListResponse {
    pub items: Vec<NotificationRow>,
    pub pagination: PageMeta,
    pub unread_count: i64,
}

/// GET /api/notifications
pub async fn handle_list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<NotificationListQuery>,
) -> Result<Json<NotificationListResponse>, AppError> {
    let page = PageQuery {
        page: query.page,
        limit: query.limit,
    }
    .validate()?;

    let (items, total) = store::list(&state.db, auth.id, query.unread_only, page).await?;
    let unread_count = store::unread_count(&state.db, auth.id).await?;

    Ok(Json(NotificationListResponse {
        items,
        pagination: page.meta(total),
        unread_count,
    }))
}

/// PUT /api/notifications/:id/read
pub async fn handle_mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<NotificationRow>, AppError> {
    let row = store::mark_read(&state.db, auth.id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Notification {id} not found")))?;
    Ok(Json(row))
}

/// PUT /api/notifications/read-all
pub async fn handle_mark_all_read(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let updated = store::mark_all_read(&state.db, auth.id).await?;
    Ok(Json(serde_json::json!({ "updated": updated })))
}

/// DELETE /api/notifications/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !store::delete(&state.db, auth.id, id).await? {
        return Err(AppError::NotFound(format!("Notification {id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/notifications/stats
pub async fn handle_stats(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<NotificationStats>, AppError> {
    Ok(Json(store::stats(&state.db, auth.id).await?))
}
