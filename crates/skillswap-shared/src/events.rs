//! Realtime event vocabulary.
//!
//! Clients join a per-user room (notifications) and per-exchange rooms
//! (chat and status updates). The engine publishes [`RealtimeEvent`]s through
//! an [`EventSink`]; delivery is fire-and-forget and never affects the
//! outcome of the operation that produced the event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::status::ExchangeStatus;

/// A pub/sub room. One per user, one per exchange.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Room {
    User(Uuid),
    Exchange(Uuid),
}

impl Room {
    /// Topic string used as the registry key.
    pub fn to_topic(&self) -> String {
        match self {
            Self::User(id) => format!("user:{id}"),
            Self::Exchange(id) => format!("exchange:{id}"),
        }
    }
}

/// Category tag on a persisted notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ExchangeRequest,
    ExchangeAccepted,
    ExchangeDeclined,
    ExchangeStatusChange,
    NewRating,
    PointsAwarded,
    PointsDeducted,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExchangeRequest => "exchange_request",
            Self::ExchangeAccepted => "exchange_accepted",
            Self::ExchangeDeclined => "exchange_declined",
            Self::ExchangeStatusChange => "exchange_status_change",
            Self::NewRating => "new_rating",
            Self::PointsAwarded => "points_awarded",
            Self::PointsDeducted => "points_deducted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "exchange_request" => Some(Self::ExchangeRequest),
            "exchange_accepted" => Some(Self::ExchangeAccepted),
            "exchange_declined" => Some(Self::ExchangeDeclined),
            "exchange_status_change" => Some(Self::ExchangeStatusChange),
            "new_rating" => Some(Self::NewRating),
            "points_awarded" => Some(Self::PointsAwarded),
            "points_deducted" => Some(Self::PointsDeducted),
            _ => None,
        }
    }
}

/// Events pushed from server to subscribed clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum RealtimeEvent {
    /// A persisted notification, pushed to the target user's room.
    Notification(NotificationEvent),
    /// A chat message, pushed to the exchange room.
    ReceiveMessage(MessageEvent),
    /// An exchange status transition, pushed to the exchange room.
    StatusChanged(StatusEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEvent {
    pub id: Uuid,
    pub exchange_id: Uuid,
    pub sender_id: Uuid,
    pub sender_name: String,
    pub content: String,
    pub message_type: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusEvent {
    pub exchange_id: Uuid,
    pub status: ExchangeStatus,
    pub updated_by: String,
}

/// Commands a websocket client may send after connecting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Subscribe to the caller's user room.
    Join { user_id: Uuid },
    /// Subscribe to an exchange room.
    JoinExchange { exchange_id: Uuid },
    /// Persist and broadcast a chat message.
    SendMessage {
        exchange_id: Uuid,
        sender_id: Uuid,
        content: String,
        #[serde(default)]
        message_type: Option<String>,
    },
    /// Relay a status change to the exchange room.
    StatusUpdate {
        exchange_id: Uuid,
        status: ExchangeStatus,
        updated_by: String,
    },
}

/// One-way publish interface the engine pushes events through.
///
/// Implementations must not block and must swallow delivery failures;
/// the core transaction has already committed by the time this is called.
pub trait EventSink: Send + Sync {
    fn publish(&self, room: &Room, event: &RealtimeEvent);
}

/// Sink that drops every event. Used in tests and offline tools.
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _room: &Room, _event: &RealtimeEvent) {}
}
