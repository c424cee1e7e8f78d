use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::tokens::{verify, TokenKind};
use crate::errors::AppError;
use crate::realtime::hub::RealtimeHub;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: String,
}

/// GET /ws?token=<access token>
/// The socket joins the room of the user named in the token.
pub async fn handle_ws(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, AppError> {
    let claims = verify(&state.config.jwt_secret, &query.token, TokenKind::Access)?;
    let hub = state.hub.clone();
    Ok(ws.on_upgrade(move |socket| run_socket(socket, claims.sub, hub)))
}

async fn run_socket(socket: WebSocket, user_id: Uuid, hub: RealtimeHub) {
    info!("Realtime socket opened for user {user_id}");
    let (mut sender, mut receiver) = socket.split();
    let mut events = hub.subscribe();

    loop {
        tokio::select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if is_ping(&text) {
                        let pong = json!({ "event": "pong" }).to_string();
                        if sender.send(Message::Text(pong)).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("Realtime socket error for user {user_id}: {e}");
                    break;
                }
            },
            event = events.recv() => match event {
                Ok(event) if event.user_id == user_id => {
                    if sender.send(Message::Text(event.frame().to_string())).await.is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Realtime socket for user {user_id} lagged, {skipped} events skipped");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    info!("Realtime socket closed for user {user_id}");
}

/// Accepts the bare `ping` keepalive as well as `{"event":"ping"}`.
fn is_ping(text: &str) -> bool {
    let text = text.trim();
    if text.eq_ignore_ascii_case("ping") {
        return true;
    }
    serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .and_then(|v| v.get("event").and_then(|e| e.as_str()).map(|e| e == "ping"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_detection() {
        assert!(is_ping("ping"));
        assert!(is_ping(" PING "));
        assert!(is_ping(r#"{"event":"ping"}"#));
        assert!(!is_ping(r#"{"event":"message"}"#));
        assert!(!is_ping("hello"));
    }
}
