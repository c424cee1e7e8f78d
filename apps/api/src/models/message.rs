use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MessageRow {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub offer_id: Option<Uuid>,
    pub content: String,
    pub read: bool,
    pub kind: String,
    pub created_at: DateTime<Utc>,
}

/// One row per (peer, offer) thread, as seen by the caller.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ConversationRow {
    pub peer_id: Uuid,
    pub peer_first_name: String,
    pub peer_last_name: String,
    pub offer_id: Option<Uuid>,
    pub offer_title: Option<String>,
    pub last_message: String,
    pub last_message_at: DateTime<Utc>,
    pub last_sender_id: Uuid,
    pub unread_count: i64,
    pub total_messages: i64,
}
