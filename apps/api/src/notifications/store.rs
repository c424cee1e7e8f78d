use serde::Serialize;
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::models::notification::{NotificationKind, NotificationRow};
use crate::pagination::Page;

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub sender_id: Option<Uuid>,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub offer_id: Option<Uuid>,
    pub data: Value,
}

#[derive(Debug, Serialize, FromRow)]
pub struct KindCount {
    pub kind: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct NotificationStats {
    pub total: i64,
    pub unread: i64,
    pub by_kind: Vec<KindCount>,
}

pub async fn insert(pool: &PgPool, new: &NewNotification) -> Result<NotificationRow, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO notifications (id, user_id, sender_id, title, message, kind, offer_id, data)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.user_id)
    .bind(new.sender_id)
    .bind(&new.title)
    .bind(&new.message)
    .bind(new.kind.as_str())
    .bind(new.offer_id)
    .bind(&new.data)
    .fetch_one(pool)
    .await
}

pub async fn list(
    pool: &PgPool,
    user_id: Uuid,
    unread_only: bool,
    page: Page,
) -> Result<(Vec<NotificationRow>, i64), sqlx::Error> {
    let rows = sqlx::query_as(
        r#"
        SELECT * FROM notifications
        WHERE user_id = $1 AND (NOT $2 OR read = FALSE)
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(user_id)
    .bind(unread_only)
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    let total = sqlx::query_scalar(
        "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND (NOT $2 OR read = FALSE)",
    )
    .bind(user_id)
    .bind(unread_only)
    .fetch_one(pool)
    .await?;

    Ok((rows, total))
}

pub async fn unread_count(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND read = FALSE")
        .bind(user_id)
        .fetch_one(pool)
        .await
}

/// Returns `None` when the notification does not exist or belongs to someone else.
pub async fn mark_read(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<Option<NotificationRow>, sqlx::Error> {
    sqlx::query_as("UPDATE notifications SET read = TRUE WHERE id = $1 AND user_id = $2 RETURNING *")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn mark_all_read(pool: &PgPool, user_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE notifications SET read = TRUE WHERE user_id = $1 AND read = FALSE")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn delete(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn stats(pool: &PgPool, user_id: Uuid) -> Result<NotificationStats, sqlx::Error> {
    let (total, unread): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*), COUNT(*) FILTER (WHERE read = FALSE)
        FROM notifications WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    let by_kind = sqlx::query_as(
        r#"
        SELECT kind, COUNT(*) AS count FROM notifications
        WHERE user_id = $1
        GROUP BY kind
        ORDER BY count DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(NotificationStats {
        total,
        unread,
        by_kind,
    })
}
