//! Fixtures shared by the store's unit tests.

use uuid::Uuid;

use crate::database::Database;
use crate::models::{NewExchange, NewUser};

pub(crate) fn test_db() -> Database {
    Database::open_in_memory().expect("in-memory database")
}

pub(crate) fn new_user(email: &str) -> NewUser {
    let suffix = Uuid::new_v4().simple().to_string();
    NewUser {
        public_id: format!("SSL{}", &suffix[..6]),
        name: format!("user-{}", &suffix[..6]),
        email: email.to_string(),
        password_hash: "ab$cd".to_string(),
        location: "Stockholm".to_string(),
        bio: String::new(),
    }
}

pub(crate) fn new_exchange(requester_id: Uuid, provider_id: Uuid) -> NewExchange {
    NewExchange {
        requester_id,
        provider_id,
        skill_id: Uuid::new_v4(),
        skill: "Cooking".to_string(),
        skill_level: "Beginner".to_string(),
        description: "Swedish cooking basics".to_string(),
        session_type: "Exchange".to_string(),
        hourly_rate: 30,
        scheduled_date: None,
        duration_hours: 2.0,
        is_mutual: false,
    }
}
