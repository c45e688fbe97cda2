//! Fixtures shared by the engine's unit tests.

use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::Mutex;
use uuid::Uuid;

use skillswap_shared::events::{EventSink, RealtimeEvent, Room};
use skillswap_shared::TransactionKind;
use skillswap_store::{Database, NewUser, User};

use crate::exchange::{ExchangeEngine, ExchangeTerms};
use crate::notify::Notifier;

/// Sink that records every published event for later assertions.
pub(crate) struct RecordingSink {
    events: StdMutex<Vec<(String, RealtimeEvent)>>,
}

impl RecordingSink {
    pub(crate) fn new() -> Self {
        Self {
            events: StdMutex::new(Vec::new()),
        }
    }

    pub(crate) fn events_for(&self, room: &Room) -> Vec<RealtimeEvent> {
        let topic = room.to_topic();
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| *t == topic)
            .map(|(_, e)| e.clone())
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn publish(&self, room: &Room, event: &RealtimeEvent) {
        self.events
            .lock()
            .unwrap()
            .push((room.to_topic(), event.clone()));
    }
}

pub(crate) fn setup() -> (ExchangeEngine, Arc<Mutex<Database>>, Arc<RecordingSink>) {
    let db = Arc::new(Mutex::new(Database::open_in_memory().unwrap()));
    let sink = Arc::new(RecordingSink::new());
    let engine = ExchangeEngine::new(db.clone(), Notifier::new(sink.clone()));
    (engine, db, sink)
}

/// Create a user and credit their opening balance through the ledger, so the
/// balance-equals-transaction-sum invariant holds from the start.
pub(crate) async fn seed_user(db: &Arc<Mutex<Database>>, email: &str, balance: i64) -> User {
    let mut db = db.lock().await;
    let suffix = Uuid::new_v4().simple().to_string();
    let user = db
        .create_user(&NewUser {
            public_id: format!("SSL{}", &suffix[..6]),
            name: format!("user-{}", &suffix[..6]),
            email: email.to_string(),
            password_hash: "ab$cd".to_string(),
            location: "Stockholm".to_string(),
            bio: String::new(),
        })
        .unwrap();
    if balance > 0 {
        db.credit(user.id, balance, TransactionKind::Bonus, "Sign-up bonus", None)
            .unwrap();
    }
    db.get_user(user.id).unwrap()
}

pub(crate) fn terms(hourly_rate: i64, duration_hours: f64) -> ExchangeTerms {
    ExchangeTerms {
        skill_id: Uuid::new_v4(),
        skill: "Cooking".to_string(),
        skill_level: "Beginner".to_string(),
        description: "Swedish cooking basics".to_string(),
        session_type: "Exchange".to_string(),
        hourly_rate,
        scheduled_date: None,
        duration_hours,
        is_mutual: false,
    }
}
