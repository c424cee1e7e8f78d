use sqlx::PgPool;
use tracing::warn;

use crate::models::notification::NotificationRow;
use crate::notifications::store::{self, NewNotification};
use crate::realtime::hub::{RealtimeHub, UserEvent, EVENT_NOTIFICATION_NEW};

/// Persists the notification and pushes it to the recipient's open sockets.
pub async fn notify(
    pool: &PgPool,
    hub: &RealtimeHub,
    new: NewNotification,
) -> Result<NotificationRow, sqlx::Error> {
    let row = store::insert(pool, &new).await?;
    match serde_json::to_value(&row) {
        Ok(data) => {
            hub.publish(UserEvent::new(row.user_id, EVENT_NOTIFICATION_NEW, data))
                .await
        }
        Err(e) => warn!("Failed to encode notification {}: {e}", row.id),
    }
    Ok(row)
}

/// Like `notify`, but a failure is only logged. Used as a side effect of
/// other requests, which must not fail because of it.
pub async fn notify_quietly(pool: &PgPool, hub: &RealtimeHub, new: NewNotification) {
    let user_id = new.user_id;
    let kind = new.kind;
    if let Err(e) = notify(pool, hub, new).await {
        warn!("Failed to create {} notification for {user_id}: {e}", kind.as_str());
    }
}
