//! Websocket realtime channel.
//!
//! Clients connect to `/ws`, then send [`ClientCommand`]s to join their user
//! room and any exchange rooms they have open. The [`Dispatcher`] keeps a
//! registry of room -> live connections and implements the engine's
//! [`EventSink`], so a committed state transition fans out to subscribers
//! without the engine knowing anything about websockets.
//!
//! Delivery is at-most-once: a send to a closed connection is logged and the
//! connection pruned; nothing is retried and no operation fails over it.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use skillswap_shared::events::{ClientCommand, EventSink, RealtimeEvent, Room, StatusEvent};

use crate::api::AppState;

type ConnSender = mpsc::UnboundedSender<Message>;

/// Room registry with explicit connect/disconnect lifecycle.
#[derive(Clone, Default)]
pub struct Dispatcher {
    /// topic -> (connection id -> outbound sender)
    rooms: Arc<RwLock<HashMap<String, HashMap<Uuid, ConnSender>>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a connection to a room.
    fn join(&self, room: &Room, conn_id: Uuid, sender: ConnSender) {
        let topic = room.to_topic();
        let mut rooms = self.rooms.write().expect("room registry poisoned");
        rooms.entry(topic.clone()).or_default().insert(conn_id, sender);
        debug!(conn = %conn_id, topic = %topic, "joined room");
    }

    /// Drop a connection from every room it joined.
    fn disconnect(&self, conn_id: Uuid) {
        let mut rooms = self.rooms.write().expect("room registry poisoned");
        rooms.retain(|_, members| {
            members.remove(&conn_id);
            !members.is_empty()
        });
    }

    #[cfg(test)]
    fn member_count(&self, room: &Room) -> usize {
        self.rooms
            .read()
            .unwrap()
            .get(&room.to_topic())
            .map(|m| m.len())
            .unwrap_or(0)
    }
}

impl EventSink for Dispatcher {
    fn publish(&self, room: &Room, event: &RealtimeEvent) {
        let payload = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "failed to encode realtime event");
                return;
            }
        };

        let mut dead = Vec::new();
        {
            let rooms = self.rooms.read().expect("room registry poisoned");
            let Some(members) = rooms.get(&room.to_topic()) else {
                return;
            };
            for (conn_id, sender) in members {
                if sender.send(Message::Text(payload.clone())).is_err() {
                    dead.push(*conn_id);
                }
            }
        }

        // Prune connections whose receive half is gone.
        for conn_id in dead {
            debug!(conn = %conn_id, "pruning closed connection");
            self.disconnect(conn_id);
        }
    }
}

/// `GET /ws` upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(|socket| handle_connection(socket, state))
}

async fn handle_connection(socket: WebSocket, state: AppState) {
    let conn_id = Uuid::new_v4();
    info!(conn = %conn_id, "websocket connected");

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    // Writer task: everything published to this connection's rooms flows
    // through the mpsc channel and out of the socket here.
    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if ws_tx.send(message).await.is_err() {
                break;
            }
        }
    });

    // Track what this connection joined for logging.
    let mut joined: HashSet<String> = HashSet::new();

    while let Some(Ok(message)) = ws_rx.next().await {
        let Message::Text(text) = message else {
            continue;
        };

        let command: ClientCommand = match serde_json::from_str(&text) {
            Ok(cmd) => cmd,
            Err(e) => {
                debug!(conn = %conn_id, error = %e, "unparseable client command");
                continue;
            }
        };

        match command {
            ClientCommand::Join { user_id } => {
                let room = Room::User(user_id);
                joined.insert(room.to_topic());
                state.dispatcher.join(&room, conn_id, tx.clone());
            }
            ClientCommand::JoinExchange { exchange_id } => {
                let room = Room::Exchange(exchange_id);
                joined.insert(room.to_topic());
                state.dispatcher.join(&room, conn_id, tx.clone());
            }
            ClientCommand::SendMessage {
                exchange_id,
                sender_id,
                content,
                message_type,
            } => {
                // Persist through the engine; the engine broadcasts the
                // stored message back to the exchange room (including this
                // connection, as delivery confirmation).
                let result = state
                    .engine
                    .send_message(exchange_id, sender_id, &content, message_type.as_deref())
                    .await;

                if let Err(e) = result {
                    debug!(conn = %conn_id, error = %e, "websocket message rejected");
                    let error = serde_json::json!({
                        "event": "message_error",
                        "data": { "error": e.to_string() },
                    });
                    let _ = tx.send(Message::Text(error.to_string()));
                }
            }
            ClientCommand::StatusUpdate {
                exchange_id,
                status,
                updated_by,
            } => {
                // Pure relay to other viewers; the REST transition endpoint
                // is the source of truth for the actual state change.
                state.dispatcher.publish(
                    &Room::Exchange(exchange_id),
                    &RealtimeEvent::StatusChanged(StatusEvent {
                        exchange_id,
                        status,
                        updated_by,
                    }),
                );
            }
        }
    }

    state.dispatcher.disconnect(conn_id);
    writer.abort();
    info!(conn = %conn_id, rooms = joined.len(), "websocket disconnected");
}
