//! CRUD operations for [`Exchange`] records.
//!
//! Status writes go through [`Database::set_exchange_status_if`], a
//! compare-and-swap on the status column: a writer that lost the race
//! observes zero affected rows instead of clobbering the newer state.
//! Exchanges are never deleted; cancellation is a terminal status.

use rusqlite::params;
use uuid::Uuid;

use skillswap_shared::ExchangeStatus;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Exchange, ExchangeWithParties, NewExchange};
use crate::row;

const EXCHANGE_COLUMNS: &str = "id, requester_id, provider_id, skill_id, skill, skill_level, \
     description, session_type, hourly_rate, scheduled_date, duration_hours, \
     is_mutual, status, created_at, updated_at";

impl Database {
    /// Insert a new exchange in `Pending` and return the stored row.
    pub fn insert_exchange(&self, new: &NewExchange) -> Result<Exchange> {
        let id = Uuid::new_v4();
        let now = chrono::Utc::now().to_rfc3339();

        self.conn().execute(
            "INSERT INTO exchanges (id, requester_id, provider_id, skill_id, skill, skill_level,
                                    description, session_type, hourly_rate, scheduled_date,
                                    duration_hours, is_mutual, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, 'Pending', ?13, ?13)",
            params![
                id.to_string(),
                new.requester_id.to_string(),
                new.provider_id.to_string(),
                new.skill_id.to_string(),
                new.skill,
                new.skill_level,
                new.description,
                new.session_type,
                new.hourly_rate,
                new.scheduled_date.map(|d| d.to_rfc3339()),
                new.duration_hours,
                new.is_mutual,
                now,
            ],
        )?;

        self.get_exchange(id)
    }

    /// Fetch a single exchange by UUID.
    pub fn get_exchange(&self, id: Uuid) -> Result<Exchange> {
        self.conn()
            .query_row(
                &format!("SELECT {EXCHANGE_COLUMNS} FROM exchanges WHERE id = ?1"),
                params![id.to_string()],
                row_to_exchange,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// List exchanges where the user is requester or provider, newest first,
    /// with both parties' names joined in.
    pub fn exchanges_for_user(&self, user_id: Uuid) -> Result<Vec<ExchangeWithParties>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {}, requester.name, provider.name
             FROM exchanges e
             JOIN users requester ON e.requester_id = requester.id
             JOIN users provider  ON e.provider_id  = provider.id
             WHERE e.requester_id = ?1 OR e.provider_id = ?1
             ORDER BY e.created_at DESC",
            prefixed_columns("e")
        ))?;

        let rows = stmt.query_map(params![user_id.to_string()], |row| {
            Ok(ExchangeWithParties {
                exchange: row_to_exchange(row)?,
                requester_name: row.get(15)?,
                provider_name: row.get(16)?,
            })
        })?;

        let mut exchanges = Vec::new();
        for row in rows {
            exchanges.push(row?);
        }
        Ok(exchanges)
    }

    /// Compare-and-swap the status column.
    ///
    /// Returns `true` when the row was in `expected` and is now `new`;
    /// `false` when a concurrent writer got there first.
    pub fn set_exchange_status_if(
        &self,
        id: Uuid,
        expected: ExchangeStatus,
        new: ExchangeStatus,
    ) -> Result<bool> {
        let now = chrono::Utc::now().to_rfc3339();
        let affected = self.conn().execute(
            "UPDATE exchanges SET status = ?3, updated_at = ?4
             WHERE id = ?1 AND status = ?2",
            params![id.to_string(), expected.as_str(), new.as_str(), now],
        )?;
        Ok(affected > 0)
    }
}

fn prefixed_columns(alias: &str) -> String {
    EXCHANGE_COLUMNS
        .split(", ")
        .map(|c| format!("{alias}.{c}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Map a `rusqlite::Row` to an [`Exchange`].
fn row_to_exchange(row: &rusqlite::Row<'_>) -> rusqlite::Result<Exchange> {
    Ok(Exchange {
        id: row::col_uuid(row, 0)?,
        requester_id: row::col_uuid(row, 1)?,
        provider_id: row::col_uuid(row, 2)?,
        skill_id: row::col_uuid(row, 3)?,
        skill: row.get(4)?,
        skill_level: row.get(5)?,
        description: row.get(6)?,
        session_type: row.get(7)?,
        hourly_rate: row.get(8)?,
        scheduled_date: row::col_ts_opt(row, 9)?,
        duration_hours: row.get(10)?,
        is_mutual: row.get(11)?,
        status: row::col_status(row, 12)?,
        created_at: row::col_ts(row, 13)?,
        updated_at: row::col_ts(row, 14)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{new_exchange, new_user, test_db};

    #[test]
    fn insert_starts_pending() {
        let db = test_db();
        let requester = db.create_user(&new_user("a@example.com")).unwrap();
        let provider = db.create_user(&new_user("b@example.com")).unwrap();

        let exchange = db
            .insert_exchange(&new_exchange(requester.id, provider.id))
            .unwrap();

        assert_eq!(exchange.status, ExchangeStatus::Pending);
        assert_eq!(exchange.hourly_rate, 30);
        assert_eq!(exchange.duration_hours, 2.0);
        assert!(exchange.has_participant(requester.id));
        assert_eq!(exchange.counterparty_of(requester.id), provider.id);
    }

    #[test]
    fn missing_exchange_is_not_found() {
        let db = test_db();
        assert!(matches!(
            db.get_exchange(Uuid::new_v4()),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn cas_succeeds_once() {
        let db = test_db();
        let requester = db.create_user(&new_user("a@example.com")).unwrap();
        let provider = db.create_user(&new_user("b@example.com")).unwrap();
        let exchange = db
            .insert_exchange(&new_exchange(requester.id, provider.id))
            .unwrap();

        assert!(db
            .set_exchange_status_if(exchange.id, ExchangeStatus::Pending, ExchangeStatus::Accepted)
            .unwrap());
        // Second writer raced and lost; nothing changes.
        assert!(!db
            .set_exchange_status_if(exchange.id, ExchangeStatus::Pending, ExchangeStatus::Cancelled)
            .unwrap());

        let stored = db.get_exchange(exchange.id).unwrap();
        assert_eq!(stored.status, ExchangeStatus::Accepted);
    }

    #[test]
    fn lists_both_sides_newest_first() {
        let db = test_db();
        let alice = db.create_user(&new_user("a@example.com")).unwrap();
        let bob = db.create_user(&new_user("b@example.com")).unwrap();
        let carol = db.create_user(&new_user("c@example.com")).unwrap();

        db.insert_exchange(&new_exchange(alice.id, bob.id)).unwrap();
        db.insert_exchange(&new_exchange(carol.id, alice.id)).unwrap();
        db.insert_exchange(&new_exchange(bob.id, carol.id)).unwrap();

        let for_alice = db.exchanges_for_user(alice.id).unwrap();
        assert_eq!(for_alice.len(), 2);
        assert_eq!(for_alice[0].requester_name, carol.name);
        assert_eq!(for_alice[0].provider_name, alice.name);
    }
}
