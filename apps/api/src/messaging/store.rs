use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::models::message::{ConversationRow, MessageRow};
use crate::pagination::Page;

#[derive(Debug, Serialize, FromRow)]
pub struct MessageStats {
    pub total: i64,
    pub unread: i64,
    pub sent: i64,
    pub received: i64,
}

pub async fn insert(
    pool: &PgPool,
    sender_id: Uuid,
    recipient_id: Uuid,
    offer_id: Option<Uuid>,
    content: &str,
) -> Result<MessageRow, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO messages (id, sender_id, recipient_id, offer_id, content)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(sender_id)
    .bind(recipient_id)
    .bind(offer_id)
    .bind(content)
    .fetch_one(pool)
    .await
}

/// Threads keyed by (peer, offer), newest activity first.
pub async fn conversations(
    pool: &PgPool,
    user_id: Uuid,
    page: Page,
) -> Result<(Vec<ConversationRow>, i64), sqlx::Error> {
    let rows = sqlx::query_as(
        r#"
        WITH mine AS (
            SELECT m.*,
                   CASE WHEN m.sender_id = $1 THEN m.recipient_id ELSE m.sender_id END AS peer_id
            FROM messages m
            WHERE m.sender_id = $1 OR m.recipient_id = $1
        ),
        threads AS (
            SELECT peer_id, offer_id,
                   COUNT(*) AS total_messages,
                   COUNT(*) FILTER (WHERE recipient_id = $1 AND read = FALSE) AS unread_count,
                   MAX(created_at) AS last_message_at
            FROM mine
            GROUP BY peer_id, offer_id
        )
        SELECT t.peer_id,
               u.first_name AS peer_first_name,
               u.last_name AS peer_last_name,
               t.offer_id,
               o.title AS offer_title,
               last.content AS last_message,
               t.last_message_at,
               last.sender_id AS last_sender_id,
               t.unread_count,
               t.total_messages
        FROM threads t
        JOIN users u ON u.id = t.peer_id
        LEFT JOIN offers o ON o.id = t.offer_id
        JOIN LATERAL (
            SELECT content, sender_id FROM mine
            WHERE mine.peer_id = t.peer_id
              AND mine.offer_id IS NOT DISTINCT FROM t.offer_id
            ORDER BY created_at DESC
            LIMIT 1
        ) last ON TRUE
        ORDER BY t.last_message_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user_id)
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    let total = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM (
            SELECT DISTINCT
                CASE WHEN sender_id = $1 THEN recipient_id ELSE sender_id END,
                offer_id
            FROM messages
            WHERE sender_id = $1 OR recipient_id = $1
        ) threads
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok((rows, total))
}

/// Messages between the caller and a peer, oldest first. `offer_id` narrows to one thread.
pub async fn thread(
    pool: &PgPool,
    user_id: Uuid,
    peer_id: Uuid,
    offer_id: Option<Uuid>,
    page: Page,
) -> Result<(Vec<MessageRow>, i64), sqlx::Error> {
    let rows = sqlx::query_as(
        r#"
        SELECT * FROM messages
        WHERE ((sender_id = $1 AND recipient_id = $2) OR (sender_id = $2 AND recipient_id = $1))
          AND ($3::uuid IS NULL OR offer_id = $3)
        ORDER BY created_at ASC
        LIMIT $4 OFFSET $5
        "#,
    )
    .bind(user_id)
    .bind(peer_id)
    .bind(offer_id)
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    let total = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM messages
        WHERE ((sender_id = $1 AND recipient_id = $2) OR (sender_id = $2 AND recipient_id = $1))
          AND ($3::uuid IS NULL OR offer_id = $3)
        "#,
    )
    .bind(user_id)
    .bind(peer_id)
    .bind(offer_id)
    .fetch_one(pool)
    .await?;

    Ok((rows, total))
}

pub async fn mark_thread_read(
    pool: &PgPool,
    user_id: Uuid,
    peer_id: Uuid,
    offer_id: Option<Uuid>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE messages SET read = TRUE
        WHERE recipient_id = $1 AND sender_id = $2 AND read = FALSE
          AND ($3::uuid IS NULL OR offer_id = $3)
        "#,
    )
    .bind(user_id)
    .bind(peer_id)
    .bind(offer_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn find(pool: &PgPool, id: Uuid) -> Result<Option<MessageRow>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM messages WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn mark_read(pool: &PgPool, id: Uuid) -> Result<MessageRow, sqlx::Error> {
    sqlx::query_as("UPDATE messages SET read = TRUE WHERE id = $1 RETURNING *")
        .bind(id)
        .fetch_one(pool)
        .await
}

pub async fn stats(pool: &PgPool, user_id: Uuid) -> Result<MessageStats, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT
            COUNT(*) AS total,
            COUNT(*) FILTER (WHERE recipient_id = $1 AND read = FALSE) AS unread,
            COUNT(*) FILTER (WHERE sender_id = $1) AS sent,
            COUNT(*) FILTER (WHERE recipient_id = $1) AS received
        FROM messages
        WHERE sender_id = $1 OR recipient_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
}
