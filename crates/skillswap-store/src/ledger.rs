//! The points ledger.
//!
//! Every balance mutation in the system goes through [`Database::debit`] or
//! [`Database::credit`]. Each call updates `users.points_balance` and appends
//! a `transactions` row inside one SQLite transaction, so the two can never
//! be observed out of sync and the crate-wide invariant holds:
//! for every user, `points_balance == SUM(transactions.amount)`.
//!
//! The ledger does not enforce a non-negative balance; the engine performs
//! policy checks before debiting.

use rusqlite::params;
use uuid::Uuid;

use skillswap_shared::TransactionKind;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Transaction, TransactionWithExchange};
use crate::row;

impl Database {
    /// Remove `amount` points from a user's balance and record a negative
    /// ledger entry. `amount` must be positive.
    pub fn debit(
        &mut self,
        user_id: Uuid,
        amount: i64,
        kind: TransactionKind,
        description: &str,
        exchange_id: Option<Uuid>,
    ) -> Result<Transaction> {
        self.apply_ledger_entry(user_id, -amount, kind, description, exchange_id)
    }

    /// Add `amount` points to a user's balance and record a positive ledger
    /// entry. `amount` must be positive.
    pub fn credit(
        &mut self,
        user_id: Uuid,
        amount: i64,
        kind: TransactionKind,
        description: &str,
        exchange_id: Option<Uuid>,
    ) -> Result<Transaction> {
        self.apply_ledger_entry(user_id, amount, kind, description, exchange_id)
    }

    /// Balance mutation + log append as one atomic unit.
    fn apply_ledger_entry(
        &mut self,
        user_id: Uuid,
        signed_amount: i64,
        kind: TransactionKind,
        description: &str,
        exchange_id: Option<Uuid>,
    ) -> Result<Transaction> {
        let id = Uuid::new_v4();
        let now = chrono::Utc::now();

        let tx = self.conn_mut().transaction()?;

        let affected = tx.execute(
            "UPDATE users SET points_balance = points_balance + ?2 WHERE id = ?1",
            params![user_id.to_string(), signed_amount],
        )?;
        if affected == 0 {
            // Dropping `tx` rolls back.
            return Err(StoreError::NotFound);
        }

        tx.execute(
            "INSERT INTO transactions (id, user_id, amount, kind, description, exchange_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id.to_string(),
                user_id.to_string(),
                signed_amount,
                kind.as_str(),
                description,
                exchange_id.map(|e| e.to_string()),
                now.to_rfc3339(),
            ],
        )?;

        tx.commit()?;

        tracing::debug!(
            user = %user_id,
            amount = signed_amount,
            kind = %kind,
            "ledger entry recorded"
        );

        Ok(Transaction {
            id,
            user_id,
            amount: signed_amount,
            kind,
            description: description.to_string(),
            exchange_id,
            created_at: now,
        })
    }

    /// Current balance of a user.
    pub fn balance_of(&self, user_id: Uuid) -> Result<i64> {
        self.conn()
            .query_row(
                "SELECT points_balance FROM users WHERE id = ?1",
                params![user_id.to_string()],
                |row| row.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// First transaction of the given kind linked to an exchange, if any.
    /// This is the idempotency probe behind the no-double-debit guarantee.
    pub fn find_transaction_for_exchange(
        &self,
        exchange_id: Uuid,
        kind: TransactionKind,
    ) -> Result<Option<Transaction>> {
        let result = self.conn().query_row(
            "SELECT id, user_id, amount, kind, description, exchange_id, created_at
             FROM transactions
             WHERE exchange_id = ?1 AND kind = ?2
             LIMIT 1",
            params![exchange_id.to_string(), kind.as_str()],
            row_to_transaction,
        );

        match result {
            Ok(t) => Ok(Some(t)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Sqlite(e)),
        }
    }

    /// A user's transaction history, newest first, with linked exchange
    /// context for display.
    pub fn transactions_for_user(
        &self,
        user_id: Uuid,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<TransactionWithExchange>> {
        let mut stmt = self.conn().prepare(
            "SELECT t.id, t.user_id, t.amount, t.kind, t.description, t.exchange_id, t.created_at,
                    e.skill, e.status
             FROM transactions t
             LEFT JOIN exchanges e ON t.exchange_id = e.id
             WHERE t.user_id = ?1
             ORDER BY t.created_at DESC
             LIMIT ?2 OFFSET ?3",
        )?;

        let rows = stmt.query_map(params![user_id.to_string(), limit, offset], |row| {
            Ok(TransactionWithExchange {
                transaction: row_to_transaction(row)?,
                skill: row.get(7)?,
                exchange_status: row::col_status_opt(row, 8)?,
            })
        })?;

        let mut transactions = Vec::new();
        for row in rows {
            transactions.push(row?);
        }
        Ok(transactions)
    }

    /// Total number of ledger entries for a user.
    pub fn transaction_count_for_user(&self, user_id: Uuid) -> Result<i64> {
        Ok(self.conn().query_row(
            "SELECT COUNT(*) FROM transactions WHERE user_id = ?1",
            params![user_id.to_string()],
            |row| row.get(0),
        )?)
    }

    /// Sum of all transaction amounts for a user. By the ledger invariant
    /// this must always equal [`Database::balance_of`].
    pub fn ledger_sum_for_user(&self, user_id: Uuid) -> Result<i64> {
        Ok(self.conn().query_row(
            "SELECT COALESCE(SUM(amount), 0) FROM transactions WHERE user_id = ?1",
            params![user_id.to_string()],
            |row| row.get(0),
        )?)
    }
}

fn row_to_transaction(row: &rusqlite::Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: row::col_uuid(row, 0)?,
        user_id: row::col_uuid(row, 1)?,
        amount: row.get(2)?,
        kind: row::col_kind(row, 3)?,
        description: row.get(4)?,
        exchange_id: row::col_uuid_opt(row, 5)?,
        created_at: row::col_ts(row, 6)?,
    })
}
