//! Per-user event fan-out.
//!
//! Every socket subscribes to one in-process broadcast channel and keeps only
//! the events addressed to its own user. With Redis configured, events travel
//! through `events:<user_id>` channels instead and a bridge task feeds them back
//! into the local channel, so every API instance sees every user's events.
//! While the bridge is down, events are delivered locally.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

const CHANNEL_PREFIX: &str = "events:";
const BRIDGE_BACKOFF_MIN: Duration = Duration::from_secs(1);
const BRIDGE_BACKOFF_MAX: Duration = Duration::from_secs(30);

pub const EVENT_MESSAGE_NEW: &str = "message:new";
pub const EVENT_NOTIFICATION_NEW: &str = "notification:new";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserEvent {
    pub user_id: Uuid,
    pub event: String,
    pub data: Value,
}

impl UserEvent {
    pub fn new(user_id: Uuid, event: &str, data: Value) -> Self {
        Self {
            user_id,
            event: event.to_string(),
            data,
        }
    }

    /// Frame sent to the client: `{"event": ..., "data": ...}`.
    pub fn frame(&self) -> Value {
        serde_json::json!({ "event": self.event, "data": self.data })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Redis,
    Local,
}

/// Redis only carries events while a bridge is feeding them back.
fn delivery(redis_configured: bool, bridge_live: bool) -> Delivery {
    if redis_configured && bridge_live {
        Delivery::Redis
    } else {
        Delivery::Local
    }
}

#[derive(Clone)]
pub struct RealtimeHub {
    tx: broadcast::Sender<UserEvent>,
    redis: Option<MultiplexedConnection>,
    bridge_live: Arc<AtomicBool>,
}

impl RealtimeHub {
    pub fn new(capacity: usize, redis: Option<MultiplexedConnection>) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        info!(
            "Realtime hub initialized (capacity {capacity}, redis: {})",
            redis.is_some()
        );
        Self {
            tx,
            redis,
            bridge_live: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UserEvent> {
        self.tx.subscribe()
    }

    pub fn connection_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn bridge_live(&self) -> bool {
        self.bridge_live.load(Ordering::Acquire)
    }

    /// Delivers an event to the user's room. Never fails: a Redis error or a
    /// stopped bridge falls back to local delivery and a room with no sockets
    /// drops the event.
    pub async fn publish(&self, event: UserEvent) {
        let route = delivery(self.redis.is_some(), self.bridge_live());
        if let (Delivery::Redis, Some(conn)) = (route, &self.redis) {
            let mut conn = conn.clone();
            match serde_json::to_string(&event) {
                Ok(payload) => {
                    let channel = format!("{CHANNEL_PREFIX}{}", event.user_id);
                    let sent: redis::RedisResult<()> = conn.publish(&channel, payload).await;
                    match sent {
                        Ok(()) => return,
                        Err(e) => warn!("Redis publish to {channel} failed, delivering locally: {e}"),
                    }
                }
                Err(e) => warn!("Failed to encode realtime event: {e}"),
            }
        }
        self.deliver_local(event);
    }

    fn deliver_local(&self, event: UserEvent) {
        match self.tx.send(event) {
            Ok(count) => debug!("Realtime event delivered to {count} sockets"),
            Err(_) => debug!("Realtime event dropped: no connected sockets"),
        }
    }

    /// Keeps the bridge running, reconnecting with exponential backoff.
    /// Spawned once at startup.
    pub async fn supervise_redis_bridge(self, client: redis::Client) {
        let mut backoff = BRIDGE_BACKOFF_MIN;
        loop {
            match self.run_redis_bridge(&client).await {
                Ok(()) => backoff = BRIDGE_BACKOFF_MIN,
                Err(e) => warn!("Realtime bridge failed: {e}"),
            }
            warn!("Realtime bridge down, delivering locally; retrying in {backoff:?}");
            tokio::time::sleep(backoff).await;
            backoff = (backoff * 2).min(BRIDGE_BACKOFF_MAX);
        }
    }

    /// Runs until the Redis subscription ends.
    pub async fn run_redis_bridge(&self, client: &redis::Client) -> anyhow::Result<()> {
        let result = self.forward_redis_events(client).await;
        self.bridge_live.store(false, Ordering::Release);
        result
    }

    async fn forward_redis_events(&self, client: &redis::Client) -> anyhow::Result<()> {
        let mut pubsub = client.get_async_pubsub().await?;
        pubsub.psubscribe(format!("{CHANNEL_PREFIX}*")).await?;
        self.bridge_live.store(true, Ordering::Release);
        info!("Realtime bridge subscribed to {CHANNEL_PREFIX}*");

        let mut messages = pubsub.on_message();
        while let Some(msg) = messages.next().await {
            let payload: String = match msg.get_payload() {
                Ok(payload) => payload,
                Err(e) => {
                    warn!("Unreadable realtime payload on {}: {e}", msg.get_channel_name());
                    continue;
                }
            };
            match serde_json::from_str::<UserEvent>(&payload) {
                Ok(event) => self.deliver_local(event),
                Err(e) => warn!("Malformed realtime event on {}: {e}", msg.get_channel_name()),
            }
        }

        warn!("Realtime bridge subscription closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_local_publish_reaches_subscribers() {
        let hub = RealtimeHub::new(16, None);
        let mut rx = hub.subscribe();
        let user = Uuid::new_v4();

        hub.publish(UserEvent::new(user, EVENT_MESSAGE_NEW, json!({"content": "hi"})))
            .await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.user_id, user);
        assert_eq!(event.event, "message:new");
    }

    #[tokio::test]
    async fn test_publish_without_sockets_is_silent() {
        let hub = RealtimeHub::new(4, None);
        assert_eq!(hub.connection_count(), 0);
        hub.publish(UserEvent::new(Uuid::new_v4(), EVENT_NOTIFICATION_NEW, json!({})))
            .await;
    }

    #[test]
    fn test_delivery_falls_back_without_bridge() {
        assert_eq!(delivery(true, true), Delivery::Redis);
        assert_eq!(delivery(true, false), Delivery::Local);
        assert_eq!(delivery(false, true), Delivery::Local);
        assert_eq!(delivery(false, false), Delivery::Local);
    }

    #[tokio::test]
    async fn test_bridge_failure_leaves_hub_local() {
        let hub = RealtimeHub::new(4, None);
        // Nothing listens on port 1, so the subscription cannot be set up.
        let client = redis::Client::open("redis://127.0.0.1:1/").unwrap();
        assert!(hub.run_redis_bridge(&client).await.is_err());
        assert!(!hub.bridge_live());

        let mut rx = hub.subscribe();
        let user = Uuid::new_v4();
        hub.publish(UserEvent::new(user, EVENT_MESSAGE_NEW, json!({}))).await;
        assert_eq!(rx.recv().await.unwrap().user_id, user);
    }

    #[test]
    fn test_frame_shape() {
        let event = UserEvent::new(Uuid::nil(), EVENT_NOTIFICATION_NEW, json!({"title": "t"}));
        assert_eq!(
            event.frame(),
            json!({"event": "notification:new", "data": {"title": "t"}})
        );
    }
}
