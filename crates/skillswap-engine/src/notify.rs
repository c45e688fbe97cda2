//! Notification creation and realtime publication.
//!
//! Every helper persists a notification row and then pushes a
//! [`RealtimeEvent::Notification`] to the target user's room. Both halves are
//! best-effort from the caller's perspective: the exchange operation that
//! triggered the notification has already committed, so failures here are
//! logged and swallowed, never propagated.

use std::sync::Arc;

use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use skillswap_shared::events::{
    EventSink, NotificationEvent, NotificationKind, RealtimeEvent, Room, StatusEvent,
};
use skillswap_shared::ExchangeStatus;
use skillswap_store::{Database, Exchange};

/// Persists notifications and fans them out to live subscribers.
#[derive(Clone)]
pub struct Notifier {
    sink: Arc<dyn EventSink>,
}

impl Notifier {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    /// Direct access to the sink, for events that are not notifications
    /// (chat messages, status broadcasts).
    pub fn publish(&self, room: &Room, event: &RealtimeEvent) {
        self.sink.publish(room, event);
    }

    /// Persist a notification and push it to the user's room.
    fn notify(
        &self,
        db: &Database,
        user_id: Uuid,
        kind: NotificationKind,
        title: &str,
        message: &str,
        payload: serde_json::Value,
    ) {
        let notification = match db.insert_notification(user_id, kind, title, message, &payload) {
            Ok(n) => n,
            Err(e) => {
                warn!(user = %user_id, error = %e, "failed to persist notification");
                return;
            }
        };

        self.sink.publish(
            &Room::User(user_id),
            &RealtimeEvent::Notification(NotificationEvent {
                id: notification.id,
                kind,
                title: notification.title,
                message: notification.message,
                payload: notification.payload,
                created_at: notification.created_at,
            }),
        );
    }

    pub fn exchange_request(&self, db: &Database, recipient: Uuid, requester_name: &str, exchange: &Exchange) {
        self.notify(
            db,
            recipient,
            NotificationKind::ExchangeRequest,
            "New Exchange Request",
            &format!("{requester_name} wants to learn {} from you", exchange.skill),
            json!({
                "exchangeId": exchange.id,
                "requesterName": requester_name,
                "skill": exchange.skill,
                "description": exchange.description,
                "action": "view_exchange",
            }),
        );
    }

    pub fn exchange_accepted(&self, db: &Database, recipient: Uuid, accepter_name: &str, exchange: &Exchange) {
        self.notify(
            db,
            recipient,
            NotificationKind::ExchangeAccepted,
            "Exchange Accepted!",
            &format!("{accepter_name} accepted your request to learn {}", exchange.skill),
            json!({
                "exchangeId": exchange.id,
                "accepterName": accepter_name,
                "skill": exchange.skill,
                "action": "view_exchange",
            }),
        );
    }

    pub fn exchange_declined(
        &self,
        db: &Database,
        recipient: Uuid,
        decliner_name: &str,
        exchange: &Exchange,
        reason: Option<&str>,
    ) {
        self.notify(
            db,
            recipient,
            NotificationKind::ExchangeDeclined,
            "Exchange Declined",
            &format!("{decliner_name} declined your request to learn {}", exchange.skill),
            json!({
                "exchangeId": exchange.id,
                "declinerName": decliner_name,
                "skill": exchange.skill,
                "reason": reason,
                "action": "view_exchange",
            }),
        );
    }

    pub fn status_change(
        &self,
        db: &Database,
        recipient: Uuid,
        exchange: &Exchange,
        status: ExchangeStatus,
        updated_by: &str,
    ) {
        let phrase = match status {
            ExchangeStatus::Accepted => "has been accepted",
            ExchangeStatus::InProgress => "is now in progress",
            ExchangeStatus::Completed => "has been completed",
            ExchangeStatus::Cancelled => "has been cancelled",
            ExchangeStatus::Pending => "is pending again",
        };

        self.notify(
            db,
            recipient,
            NotificationKind::ExchangeStatusChange,
            "Exchange Status Update",
            &format!("Your exchange {phrase} by {updated_by}"),
            json!({
                "exchangeId": exchange.id,
                "status": status,
                "updatedBy": updated_by,
                "action": "view_exchange",
            }),
        );

        // Live viewers of the exchange see the transition immediately.
        self.sink.publish(
            &Room::Exchange(exchange.id),
            &RealtimeEvent::StatusChanged(StatusEvent {
                exchange_id: exchange.id,
                status,
                updated_by: updated_by.to_string(),
            }),
        );
    }

    pub fn new_rating(
        &self,
        db: &Database,
        recipient: Uuid,
        rater_name: &str,
        score: i64,
        exchange: &Exchange,
    ) {
        self.notify(
            db,
            recipient,
            NotificationKind::NewRating,
            "New Rating Received",
            &format!("{rater_name} rated you {score}/5 stars for {}", exchange.skill),
            json!({
                "exchangeId": exchange.id,
                "raterName": rater_name,
                "score": score,
                "skill": exchange.skill,
                "action": "view_profile",
            }),
        );
    }

    pub fn points_awarded(
        &self,
        db: &Database,
        recipient: Uuid,
        amount: i64,
        reason: &str,
        exchange_id: Uuid,
    ) {
        self.notify(
            db,
            recipient,
            NotificationKind::PointsAwarded,
            "Points Awarded!",
            &format!("You earned {amount} points for {reason}"),
            json!({
                "amount": amount,
                "reason": reason,
                "exchangeId": exchange_id,
                "action": "view_transactions",
            }),
        );
    }

    pub fn points_deducted(
        &self,
        db: &Database,
        recipient: Uuid,
        amount: i64,
        reason: &str,
        exchange_id: Uuid,
    ) {
        self.notify(
            db,
            recipient,
            NotificationKind::PointsDeducted,
            "Points Deducted",
            &format!("{amount} points deducted for {reason}"),
            json!({
                "amount": amount,
                "reason": reason,
                "exchangeId": exchange_id,
                "action": "view_transactions",
            }),
        );
    }
}
