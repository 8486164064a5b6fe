//! WebSocket relay
//!
//! Hosts one broadcast topic per session. Connections join by session id,
//! publish board events, and receive every event from other participants in
//! the same session, excluding their own. The relay holds no canvas state:
//! the durable store remains the source of truth and clients resync from it
//! after any disruption.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use inkstream_canvas::SessionManager;

use crate::events::{BoardEvent, ClientFrame, ServerFrame};

/// Shared state for the relay.
pub struct RelayState {
    /// Session registry; only registered, active sessions accept joins
    pub sessions: Arc<SessionManager>,
    /// Fan-out channel shared by all connections
    pub broadcast_tx: broadcast::Sender<RelayBroadcast>,
}

impl RelayState {
    /// Create relay state over a session registry.
    #[must_use]
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            sessions,
            broadcast_tx,
        }
    }
}

/// An event fanned out to every connection in a session.
#[derive(Debug, Clone)]
pub struct RelayBroadcast {
    /// Session the event belongs to
    pub session_id: Uuid,
    /// Connection that published it (excluded from delivery)
    pub origin: Uuid,
    /// The board event
    pub event: BoardEvent,
}

/// Build the relay router.
#[must_use]
pub fn relay_router(state: Arc<RelayState>) -> Router {
    Router::new()
        .route("/ws/:session_id", get(board_ws_handler))
        .with_state(state)
}

/// WebSocket upgrade handler for a session topic.
pub async fn board_ws_handler(
    ws: WebSocketUpgrade,
    Path(session_id): Path<Uuid>,
    State(state): State<Arc<RelayState>>,
) -> impl IntoResponse {
    info!(%session_id, "websocket upgrade requested");
    ws.on_upgrade(move |socket| handle_socket(socket, session_id, state))
}

async fn handle_socket(socket: WebSocket, session_id: Uuid, state: Arc<RelayState>) {
    let connection_id = Uuid::new_v4();
    let (sender, mut receiver) = socket.split();
    let sender = Arc::new(tokio::sync::Mutex::new(sender));

    match state.sessions.get(session_id).await {
        Some(session) if session.active => {}
        _ => {
            let frame = ServerFrame::error("session_not_found", "no active session with that id");
            let mut sender = sender.lock().await;
            let _ = send_frame(&mut sender, &frame).await;
            return;
        }
    }

    info!(%session_id, %connection_id, "connection joined");
    {
        let mut sender = sender.lock().await;
        if send_frame(&mut sender, &ServerFrame::Joined { session_id })
            .await
            .is_err()
        {
            return;
        }
    }

    let mut broadcast_rx = state.broadcast_tx.subscribe();
    let sender_for_fanout = sender.clone();
    let fanout = tokio::spawn(async move {
        loop {
            match broadcast_rx.recv().await {
                Ok(msg) => {
                    if msg.session_id != session_id || msg.origin == connection_id {
                        continue;
                    }
                    let frame = ServerFrame::Event { event: msg.event };
                    let mut sender = sender_for_fanout.lock().await;
                    if send_frame(&mut sender, &frame).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // clients recover missed events from the durable store
                    warn!(%connection_id, skipped, "fan-out lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                if let Err(e) =
                    handle_client_frame(&text, session_id, connection_id, &state, &sender).await
                {
                    warn!(%connection_id, error = %e, "bad client frame");
                    let mut sender = sender.lock().await;
                    let _ = send_frame(&mut sender, &ServerFrame::error("invalid_message", e)).await;
                }
            }
            Ok(Message::Close(_)) => {
                debug!(%connection_id, "closed by client");
                break;
            }
            Ok(Message::Ping(data)) => {
                let mut sender = sender.lock().await;
                let _ = sender.send(Message::Pong(data)).await;
            }
            Err(e) => {
                warn!(%connection_id, error = %e, "websocket error");
                break;
            }
            _ => {}
        }
    }

    fanout.abort();
    info!(%session_id, %connection_id, "connection left");
}

async fn send_frame(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    frame: &ServerFrame,
) -> Result<(), String> {
    let json = serde_json::to_string(frame).map_err(|e| e.to_string())?;
    sender
        .send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}

async fn handle_client_frame(
    text: &str,
    session_id: Uuid,
    connection_id: Uuid,
    state: &Arc<RelayState>,
    sender: &Arc<tokio::sync::Mutex<futures::stream::SplitSink<WebSocket, Message>>>,
) -> Result<(), String> {
    let frame: ClientFrame = serde_json::from_str(text).map_err(|e| e.to_string())?;

    match frame {
        ClientFrame::Ping => {
            let mut sender = sender.lock().await;
            send_frame(&mut sender, &ServerFrame::Pong).await?;
        }
        ClientFrame::Event { event } => {
            let event = match event {
                BoardEvent::DrawBatch { strokes } => match BoardEvent::draw_batch(strokes) {
                    Some(filtered) => filtered,
                    // nothing drawable survived the degenerate-stroke filter
                    None => return Ok(()),
                },
                nuke @ BoardEvent::Nuke { .. } => nuke,
            };
            debug!(%session_id, %connection_id, kind = event.kind(), "relaying event");
            let _ = state.broadcast_tx.send(RelayBroadcast {
                session_id,
                origin: connection_id,
                event,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkstream_canvas::NukeEvent;

    #[tokio::test]
    async fn test_relay_state_starts_with_no_receivers() {
        let state = RelayState::new(Arc::new(SessionManager::new()));
        assert_eq!(state.broadcast_tx.receiver_count(), 0);
    }

    #[test]
    fn test_relay_broadcast_carries_origin() {
        let msg = RelayBroadcast {
            session_id: Uuid::new_v4(),
            origin: Uuid::new_v4(),
            event: BoardEvent::nuke(NukeEvent::new(None, "laser")),
        };
        assert_eq!(msg.event.kind(), "nuke");
    }
}
