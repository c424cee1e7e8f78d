use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ApplicationReceived,
    ApplicationStatus,
    NewMessage,
    NewMatch,
    General,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::ApplicationReceived => "application_received",
            NotificationKind::ApplicationStatus => "application_status",
            NotificationKind::NewMessage => "new_message",
            NotificationKind::NewMatch => "new_match",
            NotificationKind::General => "general",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NotificationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub sender_id: Option<Uuid>,
    pub title: String,
    pub message: String,
    pub kind: String,
    pub offer_id: Option<Uuid>,
    pub read: bool,
    pub data: Value,
    pub created_at: DateTime<Utc>,
}
