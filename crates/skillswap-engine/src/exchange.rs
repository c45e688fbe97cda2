//! The exchange lifecycle state machine.
//!
//! ```text
//! Pending --accept--> Accepted --> In Progress --> Completed   [terminal]
//! Pending --decline/revoke--> Cancelled                        [terminal]
//! Accepted / In Progress --> Cancelled                         [terminal]
//! ```
//!
//! Points move on three edges only:
//! - `accept` debits the requester (`Payment`).
//! - completion credits the provider (`Award`), debiting the requester first
//!   iff no `Payment` exists for the exchange yet.
//! - cancellation refunds the requester (`Award`) iff a `Payment` exists.
//!
//! Creation never touches the ledger, so an abandoned or declined request
//! needs no compensating refund.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use skillswap_shared::events::{MessageEvent, RealtimeEvent, Room};
use skillswap_shared::points::total_cost;
use skillswap_shared::{ExchangeStatus, TransactionKind};
use skillswap_store::{
    Database, Exchange, ExchangeWithParties, MessageWithSender, NewExchange, RatingWithRater,
    StoreError, User,
};

use crate::error::{EngineError, Result};
use crate::notify::Notifier;
use crate::rating;

/// Terms of a proposed exchange, independent of which side initiates.
#[derive(Debug, Clone)]
pub struct ExchangeTerms {
    pub skill_id: Uuid,
    pub skill: String,
    pub skill_level: String,
    pub description: String,
    pub session_type: String,
    pub hourly_rate: i64,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub duration_hours: f64,
    pub is_mutual: bool,
}

/// An exchange with its conversation and ratings, as returned by the detail
/// endpoint.
#[derive(Debug, Serialize)]
pub struct ExchangeDetail {
    #[serde(flatten)]
    pub exchange: Exchange,
    pub messages: Vec<MessageWithSender>,
    pub ratings: Vec<RatingWithRater>,
}

/// Owns the exchange state machine and the ledger edges attached to it.
pub struct ExchangeEngine {
    db: Arc<Mutex<Database>>,
    notifier: Notifier,
}

impl ExchangeEngine {
    pub fn new(db: Arc<Mutex<Database>>, notifier: Notifier) -> Self {
        Self { db, notifier }
    }

    /// Learner-initiated request: the initiator pays and learns, the
    /// counterparty teaches and earns.
    pub async fn create_exchange(
        &self,
        requester_id: Uuid,
        provider_id: Uuid,
        terms: ExchangeTerms,
    ) -> Result<Exchange> {
        self.create_internal(requester_id, provider_id, terms).await
    }

    /// Teacher-initiated request. The initiating teacher still takes the
    /// requester (payer) role; only the counterparty changes: it is the
    /// student being invited.
    pub async fn create_teacher_request(
        &self,
        teacher_id: Uuid,
        student_id: Uuid,
        terms: ExchangeTerms,
    ) -> Result<Exchange> {
        self.create_internal(teacher_id, student_id, terms).await
    }

    async fn create_internal(
        &self,
        requester_id: Uuid,
        counterparty_id: Uuid,
        terms: ExchangeTerms,
    ) -> Result<Exchange> {
        if requester_id == counterparty_id {
            return Err(EngineError::InvalidArgument(
                "Cannot create an exchange with yourself".into(),
            ));
        }
        if terms.skill.trim().is_empty() {
            return Err(EngineError::InvalidArgument("Skill name is required".into()));
        }
        if terms.hourly_rate < 0 {
            return Err(EngineError::InvalidArgument(
                "Hourly rate must not be negative".into(),
            ));
        }
        if !(terms.duration_hours > 0.0) {
            return Err(EngineError::InvalidArgument(
                "Duration must be a positive number of hours".into(),
            ));
        }

        let db = self.db.lock().await;

        // Counterparty must exist.
        user_or_not_found(&db, counterparty_id)?;
        let requester = user_or_not_found(&db, requester_id)?;

        // Advisory balance check. No points move until acceptance, so a
        // declined request never needs a refund.
        let cost = total_cost(terms.hourly_rate, terms.duration_hours);
        if requester.points_balance < cost {
            return Err(EngineError::InsufficientFunds {
                needed: cost,
                available: requester.points_balance,
            });
        }

        let exchange = db.insert_exchange(&NewExchange {
            requester_id,
            provider_id: counterparty_id,
            skill_id: terms.skill_id,
            skill: terms.skill,
            skill_level: terms.skill_level,
            description: terms.description,
            session_type: terms.session_type,
            hourly_rate: terms.hourly_rate,
            scheduled_date: terms.scheduled_date,
            duration_hours: terms.duration_hours,
            is_mutual: terms.is_mutual,
        })?;

        info!(
            exchange = %exchange.id,
            requester = %requester_id,
            provider = %counterparty_id,
            cost,
            "exchange created"
        );

        self.notifier
            .exchange_request(&db, counterparty_id, &requester.name, &exchange);

        Ok(exchange)
    }

    /// `Pending -> Accepted`. This is the debit edge: the requester pays the
    /// full cost and a `Payment` transaction is linked to the exchange.
    ///
    /// The balance is re-checked here: the creation-time check may be
    /// arbitrarily stale by the time someone accepts.
    pub async fn accept(&self, exchange_id: Uuid, acting_user: Uuid) -> Result<Exchange> {
        let mut db = self.db.lock().await;

        let exchange = exchange_or_not_found(&db, exchange_id)?;
        require_participant(&exchange, acting_user)?;
        if exchange.status != ExchangeStatus::Pending {
            return Err(EngineError::InvalidState("Exchange is no longer pending"));
        }

        let cost = total_cost(exchange.hourly_rate, exchange.duration_hours);
        let requester = user_or_not_found(&db, exchange.requester_id)?;
        if requester.points_balance < cost {
            return Err(EngineError::InsufficientFunds {
                needed: cost,
                available: requester.points_balance,
            });
        }

        if !db.set_exchange_status_if(
            exchange_id,
            ExchangeStatus::Pending,
            ExchangeStatus::Accepted,
        )? {
            return Err(EngineError::InvalidState("Exchange is no longer pending"));
        }

        let reason = format!("Payment for accepted exchange: {}", exchange.skill);
        db.debit(
            exchange.requester_id,
            cost,
            TransactionKind::Payment,
            &reason,
            Some(exchange_id),
        )?;

        info!(exchange = %exchange_id, amount = cost, "requester debited on accept");

        let accepter = user_or_not_found(&db, acting_user)?;
        self.notifier
            .points_deducted(&db, exchange.requester_id, cost, &reason, exchange_id);
        self.notifier.exchange_accepted(
            &db,
            exchange.counterparty_of(acting_user),
            &accepter.name,
            &exchange,
        );

        exchange_or_not_found(&db, exchange_id)
    }

    /// `Pending -> Cancelled`, callable by either participant. Nothing was
    /// debited, so there is nothing to refund.
    pub async fn decline(&self, exchange_id: Uuid, acting_user: Uuid) -> Result<Exchange> {
        let db = self.db.lock().await;

        let exchange = exchange_or_not_found(&db, exchange_id)?;
        require_participant(&exchange, acting_user)?;
        if exchange.status != ExchangeStatus::Pending {
            return Err(EngineError::InvalidState("Exchange is no longer pending"));
        }

        if !db.set_exchange_status_if(
            exchange_id,
            ExchangeStatus::Pending,
            ExchangeStatus::Cancelled,
        )? {
            return Err(EngineError::InvalidState("Exchange is no longer pending"));
        }

        let decliner = user_or_not_found(&db, acting_user)?;
        self.notifier
            .exchange_declined(&db, exchange.requester_id, &decliner.name, &exchange, None);

        exchange_or_not_found(&db, exchange_id)
    }

    /// `Pending -> Cancelled`, requester only.
    pub async fn revoke(&self, exchange_id: Uuid, acting_user: Uuid) -> Result<Exchange> {
        let db = self.db.lock().await;

        let exchange = exchange_or_not_found(&db, exchange_id)?;
        if exchange.requester_id != acting_user {
            return Err(EngineError::Forbidden(
                "Only the requester can revoke this exchange request",
            ));
        }
        if exchange.status != ExchangeStatus::Pending {
            return Err(EngineError::InvalidState(
                "Only pending exchanges can be revoked",
            ));
        }

        if !db.set_exchange_status_if(
            exchange_id,
            ExchangeStatus::Pending,
            ExchangeStatus::Cancelled,
        )? {
            return Err(EngineError::InvalidState(
                "Only pending exchanges can be revoked",
            ));
        }

        let requester = user_or_not_found(&db, acting_user)?;
        self.notifier.exchange_declined(
            &db,
            exchange.provider_id,
            &requester.name,
            &exchange,
            Some("Request was revoked by the requester"),
        );

        exchange_or_not_found(&db, exchange_id)
    }

    /// Move an exchange to an arbitrary (non-terminal-source) status.
    ///
    /// Completion pays the provider; if the exchange never went through the
    /// accept debit, the requester is debited here first (the `Payment`
    /// lookup makes completion idempotent with respect to the debit).
    /// Cancellation refunds the requester iff such a `Payment` exists.
    pub async fn update_status(
        &self,
        exchange_id: Uuid,
        acting_user: Uuid,
        new_status: ExchangeStatus,
    ) -> Result<Exchange> {
        let mut db = self.db.lock().await;

        let exchange = exchange_or_not_found(&db, exchange_id)?;
        require_participant(&exchange, acting_user)?;
        if exchange.status.is_terminal() {
            return Err(EngineError::InvalidState(
                "Exchange is already completed or cancelled",
            ));
        }

        if !db.set_exchange_status_if(exchange_id, exchange.status, new_status)? {
            return Err(EngineError::InvalidState(
                "Exchange was updated concurrently; retry",
            ));
        }

        let cost = total_cost(exchange.hourly_rate, exchange.duration_hours);

        if new_status == ExchangeStatus::Completed {
            // Defensive idempotency: debit only when the accept edge was
            // skipped and no Payment exists yet.
            let prior_payment =
                db.find_transaction_for_exchange(exchange_id, TransactionKind::Payment)?;
            if prior_payment.is_none() {
                let reason = format!("Payment for completed exchange: {}", exchange.skill);
                db.debit(
                    exchange.requester_id,
                    cost,
                    TransactionKind::Payment,
                    &reason,
                    Some(exchange_id),
                )?;
                self.notifier
                    .points_deducted(&db, exchange.requester_id, cost, &reason, exchange_id);
            }

            let reason = format!("Completed exchange: {}", exchange.skill);
            db.credit(
                exchange.provider_id,
                cost,
                TransactionKind::Award,
                &reason,
                Some(exchange_id),
            )?;
            info!(exchange = %exchange_id, amount = cost, "provider paid out on completion");
            self.notifier
                .points_awarded(&db, exchange.provider_id, cost, &reason, exchange_id);
        }

        if new_status == ExchangeStatus::Cancelled {
            // Refund only what was actually debited.
            let prior_payment =
                db.find_transaction_for_exchange(exchange_id, TransactionKind::Payment)?;
            if prior_payment.is_some() {
                let reason = format!("Refund for cancelled exchange: {}", exchange.skill);
                db.credit(
                    exchange.requester_id,
                    cost,
                    TransactionKind::Award,
                    &reason,
                    Some(exchange_id),
                )?;
                info!(exchange = %exchange_id, amount = cost, "requester refunded on cancellation");
                self.notifier
                    .points_awarded(&db, exchange.requester_id, cost, &reason, exchange_id);
            }
        }

        let actor = user_or_not_found(&db, acting_user)?;
        self.notifier.status_change(
            &db,
            exchange.counterparty_of(acting_user),
            &exchange,
            new_status,
            &actor.name,
        );

        exchange_or_not_found(&db, exchange_id)
    }

    /// Rate a completed exchange. Only the requester (learner) rates, and
    /// only the provider (teacher) can be rated.
    pub async fn rate(
        &self,
        exchange_id: Uuid,
        rater_id: Uuid,
        rated_user_id: Uuid,
        score: i64,
        review_text: Option<&str>,
    ) -> Result<RatingWithRater> {
        let db = self.db.lock().await;

        let exchange = exchange_or_not_found(&db, exchange_id)?;
        if exchange.requester_id != rater_id {
            return Err(EngineError::Forbidden("Only the learner can rate the teacher"));
        }
        if exchange.status != ExchangeStatus::Completed {
            return Err(EngineError::InvalidState("Can only rate completed exchanges"));
        }
        if rated_user_id != exchange.provider_id {
            return Err(EngineError::InvalidArgument("Invalid rating target".into()));
        }
        if !(1..=5).contains(&score) {
            return Err(EngineError::InvalidArgument(
                "Score must be between 1 and 5".into(),
            ));
        }

        let rater = user_or_not_found(&db, rater_id)?;
        let stored = db.upsert_rating(exchange_id, rater_id, rated_user_id, score, review_text)?;

        let average = rating::recompute_average(&db, rated_user_id)?;
        info!(user = %rated_user_id, average, "average rating recomputed");

        self.notifier
            .new_rating(&db, rated_user_id, &rater.name, score, &exchange);

        Ok(RatingWithRater {
            rating: stored,
            rater_name: rater.name,
        })
    }

    /// Append a chat message and broadcast it to the exchange room.
    ///
    /// Messaging carries no status restriction: participants can keep
    /// talking on completed or cancelled exchanges.
    pub async fn send_message(
        &self,
        exchange_id: Uuid,
        sender_id: Uuid,
        content: &str,
        message_type: Option<&str>,
    ) -> Result<MessageWithSender> {
        let db = self.db.lock().await;

        let exchange = exchange_or_not_found(&db, exchange_id)?;
        require_participant(&exchange, sender_id)?;
        if content.trim().is_empty() {
            return Err(EngineError::InvalidArgument(
                "Message content is required".into(),
            ));
        }

        let sender = user_or_not_found(&db, sender_id)?;
        let message =
            db.insert_message(exchange_id, sender_id, content, message_type.unwrap_or("text"))?;

        let enriched = MessageWithSender {
            message,
            sender_name: sender.name,
        };

        // At-most-once broadcast to whoever has the exchange open.
        self.notifier.publish(
            &Room::Exchange(exchange_id),
            &RealtimeEvent::ReceiveMessage(MessageEvent {
                id: enriched.message.id,
                exchange_id,
                sender_id,
                sender_name: enriched.sender_name.clone(),
                content: enriched.message.content.clone(),
                message_type: enriched.message.message_type.clone(),
                created_at: enriched.message.created_at,
            }),
        );

        Ok(enriched)
    }

    /// Exchange with conversation and ratings; participants only.
    pub async fn exchange_detail(
        &self,
        exchange_id: Uuid,
        acting_user: Uuid,
    ) -> Result<ExchangeDetail> {
        let db = self.db.lock().await;

        let exchange = exchange_or_not_found(&db, exchange_id)?;
        require_participant(&exchange, acting_user)?;

        Ok(ExchangeDetail {
            messages: db.messages_for_exchange(exchange_id)?,
            ratings: db.ratings_for_exchange(exchange_id)?,
            exchange,
        })
    }

    /// All exchanges where the user is on either side, newest first.
    pub async fn my_exchanges(&self, user_id: Uuid) -> Result<Vec<ExchangeWithParties>> {
        let db = self.db.lock().await;
        Ok(db.exchanges_for_user(user_id)?)
    }
}

fn require_participant(exchange: &Exchange, user_id: Uuid) -> Result<()> {
    if exchange.has_participant(user_id) {
        Ok(())
    } else {
        Err(EngineError::Forbidden(
            "Only participants in this exchange can do that",
        ))
    }
}

fn exchange_or_not_found(db: &Database, id: Uuid) -> Result<Exchange> {
    db.get_exchange(id).map_err(|e| match e {
        StoreError::NotFound => EngineError::NotFound("Exchange not found"),
        other => EngineError::Store(other),
    })
}

fn user_or_not_found(db: &Database, id: Uuid) -> Result<User> {
    db.get_user(id).map_err(|e| match e {
        StoreError::NotFound => EngineError::NotFound("User not found"),
        other => EngineError::Store(other),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_user, setup, terms};
    use skillswap_shared::events::NotificationKind;

    #[tokio::test]
    async fn self_exchange_rejected_regardless_of_balance() {
        let (engine, db, _sink) = setup();
        let alice = seed_user(&db, "alice@example.com", 1_000).await;

        let err = engine
            .create_exchange(alice.id, alice.id, terms(30, 2.0))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn missing_counterparty_is_not_found() {
        let (engine, db, _sink) = setup();
        let alice = seed_user(&db, "alice@example.com", 100).await;

        let err = engine
            .create_exchange(alice.id, Uuid::new_v4(), terms(30, 2.0))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[tokio::test]
    async fn creation_checks_initiator_balance_but_moves_no_points() {
        let (engine, db, _sink) = setup();
        let alice = seed_user(&db, "alice@example.com", 50).await;
        let bob = seed_user(&db, "bob@example.com", 100).await;

        // 30 * 2h = 60 > 50.
        let err = engine
            .create_exchange(alice.id, bob.id, terms(30, 2.0))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::InsufficientFunds { needed: 60, available: 50 }
        ));

        // Affordable terms: still no ledger movement at creation.
        engine
            .create_exchange(alice.id, bob.id, terms(20, 2.0))
            .await
            .unwrap();
        let db = db.lock().await;
        assert_eq!(db.balance_of(alice.id).unwrap(), 50);
        assert_eq!(db.transaction_count_for_user(alice.id).unwrap(), 1); // sign-up bonus only
    }

    #[tokio::test]
    async fn teacher_request_still_charges_the_initiator() {
        let (engine, db, _sink) = setup();
        let teacher = seed_user(&db, "teacher@example.com", 10).await;
        let student = seed_user(&db, "student@example.com", 1_000).await;

        // The initiating teacher takes the requester role and must afford it.
        let err = engine
            .create_teacher_request(teacher.id, student.id, terms(30, 2.0))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InsufficientFunds { .. }));

        let exchange = engine
            .create_teacher_request(teacher.id, student.id, terms(5, 2.0))
            .await
            .unwrap();
        assert_eq!(exchange.requester_id, teacher.id);
        assert_eq!(exchange.provider_id, student.id);
    }

    #[tokio::test]
    async fn accept_debits_requester_once() {
        // Scenario A: U1 (100 points) requests 30/hr x 2h from U2.
        let (engine, db, _sink) = setup();
        let u1 = seed_user(&db, "u1@example.com", 100).await;
        let u2 = seed_user(&db, "u2@example.com", 100).await;

        let exchange = engine
            .create_exchange(u1.id, u2.id, terms(30, 2.0))
            .await
            .unwrap();
        let accepted = engine.accept(exchange.id, u2.id).await.unwrap();
        assert_eq!(accepted.status, ExchangeStatus::Accepted);

        let db = db.lock().await;
        assert_eq!(db.balance_of(u1.id).unwrap(), 40);
        let payment = db
            .find_transaction_for_exchange(exchange.id, TransactionKind::Payment)
            .unwrap()
            .expect("payment recorded");
        assert_eq!(payment.amount, -60);
        assert_eq!(payment.user_id, u1.id);
        assert_eq!(db.balance_of(u1.id).unwrap(), db.ledger_sum_for_user(u1.id).unwrap());
    }

    #[tokio::test]
    async fn accept_rechecks_balance_at_accept_time() {
        let (engine, db, _sink) = setup();
        let u1 = seed_user(&db, "u1@example.com", 100).await;
        let u2 = seed_user(&db, "u2@example.com", 100).await;

        let exchange = engine
            .create_exchange(u1.id, u2.id, terms(30, 2.0))
            .await
            .unwrap();

        // An intervening spend drains the requester below the cost.
        {
            let mut db = db.lock().await;
            db.debit(u1.id, 80, TransactionKind::Payment, "other spend", None)
                .unwrap();
        }

        let err = engine.accept(exchange.id, u2.id).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::InsufficientFunds { needed: 60, available: 20 }
        ));

        // Nothing changed: still pending, no payment for this exchange.
        let db = db.lock().await;
        assert_eq!(
            db.get_exchange(exchange.id).unwrap().status,
            ExchangeStatus::Pending
        );
        assert!(db
            .find_transaction_for_exchange(exchange.id, TransactionKind::Payment)
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn accept_requires_participant_and_pending() {
        let (engine, db, _sink) = setup();
        let u1 = seed_user(&db, "u1@example.com", 100).await;
        let u2 = seed_user(&db, "u2@example.com", 100).await;
        let outsider = seed_user(&db, "mallory@example.com", 100).await;

        let exchange = engine
            .create_exchange(u1.id, u2.id, terms(30, 2.0))
            .await
            .unwrap();

        let err = engine.accept(exchange.id, outsider.id).await.unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));

        engine.accept(exchange.id, u2.id).await.unwrap();
        let err = engine.accept(exchange.id, u2.id).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
    }

    #[tokio::test]
    async fn completion_pays_provider_without_double_debit() {
        // Scenario B: continuing A, transition to Completed.
        let (engine, db, _sink) = setup();
        let u1 = seed_user(&db, "u1@example.com", 100).await;
        let u2 = seed_user(&db, "u2@example.com", 100).await;

        let exchange = engine
            .create_exchange(u1.id, u2.id, terms(30, 2.0))
            .await
            .unwrap();
        engine.accept(exchange.id, u2.id).await.unwrap();
        engine
            .update_status(exchange.id, u1.id, ExchangeStatus::Completed)
            .await
            .unwrap();

        let db = db.lock().await;
        assert_eq!(db.balance_of(u1.id).unwrap(), 40);
        assert_eq!(db.balance_of(u2.id).unwrap(), 160);

        // Exactly one Payment for this exchange: the accept-time debit.
        let payments = db
            .transactions_for_user(u1.id, 50, 0)
            .unwrap()
            .into_iter()
            .filter(|t| {
                t.transaction.kind == TransactionKind::Payment
                    && t.transaction.exchange_id == Some(exchange.id)
            })
            .count();
        assert_eq!(payments, 1);
    }

    #[tokio::test]
    async fn completion_without_accept_debits_defensively() {
        let (engine, db, _sink) = setup();
        let u1 = seed_user(&db, "u1@example.com", 100).await;
        let u2 = seed_user(&db, "u2@example.com", 100).await;

        let exchange = engine
            .create_exchange(u1.id, u2.id, terms(30, 2.0))
            .await
            .unwrap();
        // Skip accept entirely: Pending -> Completed via the generic path.
        engine
            .update_status(exchange.id, u2.id, ExchangeStatus::Completed)
            .await
            .unwrap();

        let db = db.lock().await;
        assert_eq!(db.balance_of(u1.id).unwrap(), 40);
        assert_eq!(db.balance_of(u2.id).unwrap(), 160);
    }

    #[tokio::test]
    async fn decline_leaves_no_ledger_trace() {
        // Scenario C.
        let (engine, db, _sink) = setup();
        let u1 = seed_user(&db, "u1@example.com", 100).await;
        let u2 = seed_user(&db, "u2@example.com", 100).await;

        let exchange = engine
            .create_exchange(u1.id, u2.id, terms(30, 2.0))
            .await
            .unwrap();
        let declined = engine.decline(exchange.id, u2.id).await.unwrap();
        assert_eq!(declined.status, ExchangeStatus::Cancelled);

        let db = db.lock().await;
        assert_eq!(db.balance_of(u1.id).unwrap(), 100);
        assert!(db
            .find_transaction_for_exchange(exchange.id, TransactionKind::Payment)
            .unwrap()
            .is_none());
        assert!(db
            .find_transaction_for_exchange(exchange.id, TransactionKind::Award)
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn cancellation_after_accept_refunds_the_debit() {
        // Scenario D: debited 60 of 100, then cancelled.
        let (engine, db, _sink) = setup();
        let u1 = seed_user(&db, "u1@example.com", 100).await;
        let u2 = seed_user(&db, "u2@example.com", 100).await;

        let exchange = engine
            .create_exchange(u1.id, u2.id, terms(30, 2.0))
            .await
            .unwrap();
        engine.accept(exchange.id, u2.id).await.unwrap();
        {
            let db = db.lock().await;
            assert_eq!(db.balance_of(u1.id).unwrap(), 40);
        }

        engine
            .update_status(exchange.id, u1.id, ExchangeStatus::Cancelled)
            .await
            .unwrap();

        let db = db.lock().await;
        // Net restored, but the history keeps both entries: the Payment and
        // the refund Award. A reversal would have erased the trail.
        assert_eq!(db.balance_of(u1.id).unwrap(), 100);
        assert_eq!(db.transaction_count_for_user(u1.id).unwrap(), 3); // bonus, payment, refund
        let refund = db
            .find_transaction_for_exchange(exchange.id, TransactionKind::Award)
            .unwrap()
            .expect("refund recorded");
        assert_eq!(refund.amount, 60);
        assert_eq!(refund.user_id, u1.id);
    }

    #[tokio::test]
    async fn cancellation_without_debit_refunds_nothing() {
        let (engine, db, _sink) = setup();
        let u1 = seed_user(&db, "u1@example.com", 100).await;
        let u2 = seed_user(&db, "u2@example.com", 100).await;

        let exchange = engine
            .create_exchange(u1.id, u2.id, terms(30, 2.0))
            .await
            .unwrap();
        // Pending -> Cancelled through the generic path; no Payment exists,
        // so no refund is minted out of thin air.
        engine
            .update_status(exchange.id, u1.id, ExchangeStatus::Cancelled)
            .await
            .unwrap();

        let db = db.lock().await;
        assert_eq!(db.balance_of(u1.id).unwrap(), 100);
        assert!(db
            .find_transaction_for_exchange(exchange.id, TransactionKind::Award)
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn terminal_states_admit_no_transitions() {
        let (engine, db, _sink) = setup();
        let u1 = seed_user(&db, "u1@example.com", 100).await;
        let u2 = seed_user(&db, "u2@example.com", 100).await;

        let completed = engine
            .create_exchange(u1.id, u2.id, terms(30, 1.0))
            .await
            .unwrap();
        engine.accept(completed.id, u2.id).await.unwrap();
        engine
            .update_status(completed.id, u1.id, ExchangeStatus::Completed)
            .await
            .unwrap();

        let cancelled = engine
            .create_exchange(u1.id, u2.id, terms(30, 1.0))
            .await
            .unwrap();
        engine.decline(cancelled.id, u2.id).await.unwrap();

        for terminal in [completed.id, cancelled.id] {
            for target in [
                ExchangeStatus::Pending,
                ExchangeStatus::Accepted,
                ExchangeStatus::InProgress,
                ExchangeStatus::Completed,
                ExchangeStatus::Cancelled,
            ] {
                let err = engine.update_status(terminal, u1.id, target).await.unwrap_err();
                assert!(matches!(err, EngineError::InvalidState(_)));
            }
            assert!(matches!(
                engine.accept(terminal, u1.id).await.unwrap_err(),
                EngineError::InvalidState(_)
            ));
            assert!(matches!(
                engine.decline(terminal, u1.id).await.unwrap_err(),
                EngineError::InvalidState(_)
            ));
            assert!(matches!(
                engine.revoke(terminal, u1.id).await.unwrap_err(),
                EngineError::InvalidState(_)
            ));
        }
    }

    #[tokio::test]
    async fn total_cost_is_identical_on_every_edge() {
        // Fractional duration exercises the rounding path: 35 * 1.5 = 52.5,
        // rounded to 53 everywhere.
        let (engine, db, _sink) = setup();
        let u1 = seed_user(&db, "u1@example.com", 100).await;
        let u2 = seed_user(&db, "u2@example.com", 100).await;

        let exchange = engine
            .create_exchange(u1.id, u2.id, terms(35, 1.5))
            .await
            .unwrap();
        engine.accept(exchange.id, u2.id).await.unwrap();
        engine
            .update_status(exchange.id, u1.id, ExchangeStatus::Completed)
            .await
            .unwrap();

        let db = db.lock().await;
        let payment = db
            .find_transaction_for_exchange(exchange.id, TransactionKind::Payment)
            .unwrap()
            .unwrap();
        let award = db
            .find_transaction_for_exchange(exchange.id, TransactionKind::Award)
            .unwrap()
            .unwrap();
        assert_eq!(payment.amount, -53);
        assert_eq!(award.amount, 53);
        assert_eq!(db.balance_of(u1.id).unwrap(), 47);
        assert_eq!(db.balance_of(u2.id).unwrap(), 153);
    }

    #[tokio::test]
    async fn revoke_is_requester_only() {
        let (engine, db, sink) = setup();
        let u1 = seed_user(&db, "u1@example.com", 100).await;
        let u2 = seed_user(&db, "u2@example.com", 100).await;

        let exchange = engine
            .create_exchange(u1.id, u2.id, terms(30, 2.0))
            .await
            .unwrap();

        let err = engine.revoke(exchange.id, u2.id).await.unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));

        let revoked = engine.revoke(exchange.id, u1.id).await.unwrap();
        assert_eq!(revoked.status, ExchangeStatus::Cancelled);

        // The provider was told, with the revocation reason attached.
        let db = db.lock().await;
        let notifications = db.notifications_for_user(u2.id, 50).unwrap();
        let declined = notifications
            .iter()
            .find(|n| n.kind == NotificationKind::ExchangeDeclined)
            .expect("provider notified");
        assert_eq!(
            declined.payload["reason"],
            "Request was revoked by the requester"
        );
        assert!(!sink.events_for(&Room::User(u2.id)).is_empty());
    }

    #[tokio::test]
    async fn messaging_is_participant_only_and_broadcast() {
        let (engine, db, sink) = setup();
        let u1 = seed_user(&db, "u1@example.com", 100).await;
        let u2 = seed_user(&db, "u2@example.com", 100).await;
        let outsider = seed_user(&db, "mallory@example.com", 100).await;

        let exchange = engine
            .create_exchange(u1.id, u2.id, terms(30, 2.0))
            .await
            .unwrap();

        let err = engine
            .send_message(exchange.id, outsider.id, "hi", None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));

        let err = engine
            .send_message(exchange.id, u1.id, "   ", None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument(_)));

        let sent = engine
            .send_message(exchange.id, u1.id, "see you tuesday", None)
            .await
            .unwrap();
        assert_eq!(sent.sender_name, u1.name);
        assert_eq!(sent.message.message_type, "text");

        let broadcast = sink.events_for(&Room::Exchange(exchange.id));
        assert_eq!(broadcast.len(), 1);
        assert!(matches!(broadcast[0], RealtimeEvent::ReceiveMessage(_)));

        // No status restriction: messages still flow after cancellation.
        engine.decline(exchange.id, u2.id).await.unwrap();
        engine
            .send_message(exchange.id, u2.id, "sorry about that", None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn detail_is_participant_only() {
        let (engine, db, _sink) = setup();
        let u1 = seed_user(&db, "u1@example.com", 100).await;
        let u2 = seed_user(&db, "u2@example.com", 100).await;
        let outsider = seed_user(&db, "mallory@example.com", 100).await;

        let exchange = engine
            .create_exchange(u1.id, u2.id, terms(30, 2.0))
            .await
            .unwrap();
        engine
            .send_message(exchange.id, u1.id, "hello", None)
            .await
            .unwrap();

        let err = engine.exchange_detail(exchange.id, outsider.id).await.unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));

        let detail = engine.exchange_detail(exchange.id, u2.id).await.unwrap();
        assert_eq!(detail.messages.len(), 1);
        assert!(detail.ratings.is_empty());

        let mine = engine.my_exchanges(u1.id).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert!(engine.my_exchanges(outsider.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn lifecycle_notifications_reach_the_right_users() {
        let (engine, db, sink) = setup();
        let u1 = seed_user(&db, "u1@example.com", 100).await;
        let u2 = seed_user(&db, "u2@example.com", 100).await;

        let exchange = engine
            .create_exchange(u1.id, u2.id, terms(30, 2.0))
            .await
            .unwrap();
        engine.accept(exchange.id, u2.id).await.unwrap();

        let db = db.lock().await;
        let for_provider = db.notifications_for_user(u2.id, 50).unwrap();
        assert!(for_provider
            .iter()
            .any(|n| n.kind == NotificationKind::ExchangeRequest));

        let for_requester = db.notifications_for_user(u1.id, 50).unwrap();
        assert!(for_requester
            .iter()
            .any(|n| n.kind == NotificationKind::PointsDeducted));
        assert!(for_requester
            .iter()
            .any(|n| n.kind == NotificationKind::ExchangeAccepted));

        // Status transitions also hit the exchange room.
        drop(db);
        engine
            .update_status(exchange.id, u1.id, ExchangeStatus::InProgress)
            .await
            .unwrap();
        let room_events = sink.events_for(&Room::Exchange(exchange.id));
        assert!(room_events
            .iter()
            .any(|e| matches!(e, RealtimeEvent::StatusChanged(_))));
    }
}
