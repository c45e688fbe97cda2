//! Append-only [`Message`] storage.

use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::Result;
use crate::models::{Message, MessageWithSender};
use crate::row;

impl Database {
    /// Append a message to an exchange's conversation.
    pub fn insert_message(
        &self,
        exchange_id: Uuid,
        sender_id: Uuid,
        content: &str,
        message_type: &str,
    ) -> Result<Message> {
        let id = Uuid::new_v4();
        let now = chrono::Utc::now();

        self.conn().execute(
            "INSERT INTO messages (id, exchange_id, sender_id, content, message_type, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id.to_string(),
                exchange_id.to_string(),
                sender_id.to_string(),
                content,
                message_type,
                now.to_rfc3339(),
            ],
        )?;

        Ok(Message {
            id,
            exchange_id,
            sender_id,
            content: content.to_string(),
            message_type: message_type.to_string(),
            created_at: now,
        })
    }

    /// Conversation history for an exchange, oldest first, with sender names.
    pub fn messages_for_exchange(&self, exchange_id: Uuid) -> Result<Vec<MessageWithSender>> {
        let mut stmt = self.conn().prepare(
            "SELECT m.id, m.exchange_id, m.sender_id, m.content, m.message_type, m.created_at,
                    u.name
             FROM messages m
             JOIN users u ON m.sender_id = u.id
             WHERE m.exchange_id = ?1
             ORDER BY m.created_at ASC",
        )?;

        let rows = stmt.query_map(params![exchange_id.to_string()], row_to_message_with_sender)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }
}

fn row_to_message_with_sender(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageWithSender> {
    Ok(MessageWithSender {
        message: Message {
            id: row::col_uuid(row, 0)?,
            exchange_id: row::col_uuid(row, 1)?,
            sender_id: row::col_uuid(row, 2)?,
            content: row.get(3)?,
            message_type: row.get(4)?,
            created_at: row::col_ts(row, 5)?,
        },
        sender_name: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{new_exchange, new_user, test_db};

    #[test]
    fn conversation_is_ordered_ascending() {
        let db = test_db();
        let alice = db.create_user(&new_user("a@example.com")).unwrap();
        let bob = db.create_user(&new_user("b@example.com")).unwrap();
        let exchange = db.insert_exchange(&new_exchange(alice.id, bob.id)).unwrap();

        db.insert_message(exchange.id, alice.id, "hej", "text").unwrap();
        db.insert_message(exchange.id, bob.id, "hello", "text").unwrap();
        db.insert_message(exchange.id, alice.id, "when suits you?", "text")
            .unwrap();

        let history = db.messages_for_exchange(exchange.id).unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].message.content, "hej");
        assert_eq!(history[0].sender_name, alice.name);
        assert_eq!(history[2].message.content, "when suits you?");
        assert!(history.windows(2).all(|w| {
            w[0].message.created_at <= w[1].message.created_at
        }));
    }

    #[test]
    fn empty_conversation() {
        let db = test_db();
        let alice = db.create_user(&new_user("a@example.com")).unwrap();
        let bob = db.create_user(&new_user("b@example.com")).unwrap();
        let exchange = db.insert_exchange(&new_exchange(alice.id, bob.id)).unwrap();

        assert!(db.messages_for_exchange(exchange.id).unwrap().is_empty());
    }
}
