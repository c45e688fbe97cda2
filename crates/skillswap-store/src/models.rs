//! Domain model structs persisted in the SQLite database.
//!
//! Every struct derives `Serialize` so it can be handed directly to the API
//! layer. Enriched variants (`*WithParties`, `*WithSender`, ...) carry the
//! joined display fields the original endpoints return alongside the row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use skillswap_shared::events::NotificationKind;
use skillswap_shared::{ExchangeStatus, TransactionKind};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// Unique user identifier.
    pub id: Uuid,
    /// Public display handle (e.g. `SSL123456`).
    pub public_id: String,
    pub name: String,
    pub email: String,
    /// Salted password digest. Never serialized to API responses; the server
    /// converts to [`UserProfile`] first.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub location: String,
    pub bio: String,
    /// Current ledger balance. Equals the sum of the user's transactions.
    pub points_balance: i64,
    /// Derived mean of received rating scores, 0 when unrated.
    pub average_rating: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public view of a user, safe to return from any endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub id: Uuid,
    pub public_id: String,
    pub name: String,
    pub email: String,
    pub location: String,
    pub bio: String,
    pub points_balance: i64,
    pub average_rating: f64,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            public_id: user.public_id,
            name: user.name,
            email: user.email,
            location: user.location,
            bio: user.bio,
            points_balance: user.points_balance,
            average_rating: user.average_rating,
            created_at: user.created_at,
        }
    }
}

/// Fields for creating a user. The caller supplies an already-hashed
/// credential; the store never sees plaintext passwords. Accounts are
/// created with a zero balance — the sign-up credit arrives as a `Bonus`
/// ledger transaction so the balance always equals the transaction sum.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub public_id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub location: String,
    pub bio: String,
}

/// Profile fields a user may edit. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
}

// ---------------------------------------------------------------------------
// Skill catalog
// ---------------------------------------------------------------------------

/// A catalog entry users can offer or request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Skill {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub category: String,
    pub skill_level: String,
    pub hourly_rate: i64,
}

/// A (user, skill) pairing: what the user teaches and at what rate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkillOffering {
    pub id: Uuid,
    pub user_id: Uuid,
    pub skill_id: Uuid,
    pub skill_level: String,
    pub hourly_rate: i64,
    pub description: String,
    /// Joined from the skill catalog.
    pub skill_name: String,
    pub category: String,
}

/// One row of a teacher search: a user offering a skill, with the offering's
/// terms and the catalog entry joined in.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TeacherMatch {
    #[serde(flatten)]
    pub teacher: UserProfile,
    pub skill_level: String,
    pub hourly_rate: i64,
    pub skill_description: String,
    pub skill_name: String,
    pub skill_category: String,
}

// ---------------------------------------------------------------------------
// Exchange
// ---------------------------------------------------------------------------

/// A proposed or active teaching session between a requester (payer/learner)
/// and a provider (payee/teacher).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Exchange {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub provider_id: Uuid,
    pub skill_id: Uuid,
    /// Skill name snapshot taken at creation.
    pub skill: String,
    pub skill_level: String,
    pub description: String,
    pub session_type: String,
    pub hourly_rate: i64,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub duration_hours: f64,
    pub is_mutual: bool,
    pub status: ExchangeStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Exchange {
    /// `true` if `user_id` is the requester or the provider.
    pub fn has_participant(&self, user_id: Uuid) -> bool {
        self.requester_id == user_id || self.provider_id == user_id
    }

    /// The other party of the exchange, from `user_id`'s point of view.
    pub fn counterparty_of(&self, user_id: Uuid) -> Uuid {
        if self.requester_id == user_id {
            self.provider_id
        } else {
            self.requester_id
        }
    }
}

/// Terms supplied when creating an exchange. Role assignment (who is
/// requester, who is provider) is decided by the engine before this reaches
/// the store.
#[derive(Debug, Clone)]
pub struct NewExchange {
    pub requester_id: Uuid,
    pub provider_id: Uuid,
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

/// An exchange joined with both parties' display names.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExchangeWithParties {
    #[serde(flatten)]
    pub exchange: Exchange,
    pub requester_name: String,
    pub provider_name: String,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single chat message inside an exchange. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: Uuid,
    pub exchange_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub message_type: String,
    pub created_at: DateTime<Utc>,
}

/// A message joined with the sender's display name.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MessageWithSender {
    #[serde(flatten)]
    pub message: Message,
    pub sender_name: String,
}

// ---------------------------------------------------------------------------
// Rating
// ---------------------------------------------------------------------------

/// The requester's rating of the provider for one completed exchange.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rating {
    pub id: Uuid,
    pub exchange_id: Uuid,
    pub rater_id: Uuid,
    pub rated_user_id: Uuid,
    pub score: i64,
    pub review_text: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A rating joined with the rater's display name.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RatingWithRater {
    #[serde(flatten)]
    pub rating: Rating,
    pub rater_name: String,
}

// ---------------------------------------------------------------------------
// Ledger transaction
// ---------------------------------------------------------------------------

/// One immutable ledger entry. Negative amounts are debits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
    pub kind: TransactionKind,
    pub description: String,
    pub exchange_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// A transaction joined with context from its linked exchange, for history
/// listings.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TransactionWithExchange {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub skill: Option<String>,
    pub exchange_status: Option<ExchangeStatus>,
}

// ---------------------------------------------------------------------------
// Notification
// ---------------------------------------------------------------------------

/// A user-scoped event record. Content is immutable after creation; only the
/// read flag transitions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub payload: serde_json::Value,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}
