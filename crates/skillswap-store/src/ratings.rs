//! [`Rating`] storage and aggregation queries.
//!
//! At most one rating exists per exchange; re-rating replaces the previous
//! row (keyed by the `exchange_id` unique constraint).

use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::Result;
use crate::models::{Rating, RatingWithRater};
use crate::row;

impl Database {
    /// Insert or replace the rating for an exchange.
    pub fn upsert_rating(
        &self,
        exchange_id: Uuid,
        rater_id: Uuid,
        rated_user_id: Uuid,
        score: i64,
        review_text: Option<&str>,
    ) -> Result<Rating> {
        let id = Uuid::new_v4();
        let now = chrono::Utc::now();

        self.conn().execute(
            "INSERT OR REPLACE INTO ratings
                 (id, exchange_id, rater_id, rated_user_id, score, review_text, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id.to_string(),
                exchange_id.to_string(),
                rater_id.to_string(),
                rated_user_id.to_string(),
                score,
                review_text,
                now.to_rfc3339(),
            ],
        )?;

        Ok(Rating {
            id,
            exchange_id,
            rater_id,
            rated_user_id,
            score,
            review_text: review_text.map(str::to_string),
            created_at: now,
        })
    }

    /// Ratings recorded against one exchange (zero or one), with rater names.
    pub fn ratings_for_exchange(&self, exchange_id: Uuid) -> Result<Vec<RatingWithRater>> {
        self.rating_rows(
            "WHERE r.exchange_id = ?1 ORDER BY r.created_at DESC",
            exchange_id,
        )
    }

    /// All ratings received by a user, newest first, with rater names.
    pub fn ratings_for_user(&self, rated_user_id: Uuid) -> Result<Vec<RatingWithRater>> {
        self.rating_rows(
            "WHERE r.rated_user_id = ?1 ORDER BY r.created_at DESC",
            rated_user_id,
        )
    }

    /// Arithmetic mean of the scores received by a user; 0 when unrated.
    pub fn average_score_for_user(&self, rated_user_id: Uuid) -> Result<f64> {
        let avg: Option<f64> = self.conn().query_row(
            "SELECT AVG(score) FROM ratings WHERE rated_user_id = ?1",
            params![rated_user_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(avg.unwrap_or(0.0))
    }

    fn rating_rows(&self, tail: &str, key: Uuid) -> Result<Vec<RatingWithRater>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT r.id, r.exchange_id, r.rater_id, r.rated_user_id, r.score, r.review_text,
                    r.created_at, u.name
             FROM ratings r
             JOIN users u ON r.rater_id = u.id
             {tail}"
        ))?;

        let rows = stmt.query_map(params![key.to_string()], row_to_rating_with_rater)?;

        let mut ratings = Vec::new();
        for row in rows {
            ratings.push(row?);
        }
        Ok(ratings)
    }
}

fn row_to_rating_with_rater(row: &rusqlite::Row<'_>) -> rusqlite::Result<RatingWithRater> {
    Ok(RatingWithRater {
        rating: Rating {
            id: row::col_uuid(row, 0)?,
            exchange_id: row::col_uuid(row, 1)?,
            rater_id: row::col_uuid(row, 2)?,
            rated_user_id: row::col_uuid(row, 3)?,
            score: row.get(4)?,
            review_text: row.get(5)?,
            created_at: row::col_ts(row, 6)?,
        },
        rater_name: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{new_exchange, new_user, test_db};

    #[test]
    fn one_rating_per_exchange() {
        let db = test_db();
        let alice = db.create_user(&new_user("a@example.com")).unwrap();
        let bob = db.create_user(&new_user("b@example.com")).unwrap();
        let exchange = db.insert_exchange(&new_exchange(alice.id, bob.id)).unwrap();

        db.upsert_rating(exchange.id, alice.id, bob.id, 3, None).unwrap();
        db.upsert_rating(exchange.id, alice.id, bob.id, 5, Some("better the second time"))
            .unwrap();

        let ratings = db.ratings_for_exchange(exchange.id).unwrap();
        assert_eq!(ratings.len(), 1);
        assert_eq!(ratings[0].rating.score, 5);
        assert_eq!(ratings[0].rater_name, alice.name);
    }

    #[test]
    fn average_over_multiple_exchanges() {
        let db = test_db();
        let alice = db.create_user(&new_user("a@example.com")).unwrap();
        let carol = db.create_user(&new_user("c@example.com")).unwrap();
        let bob = db.create_user(&new_user("b@example.com")).unwrap();

        let e1 = db.insert_exchange(&new_exchange(alice.id, bob.id)).unwrap();
        let e2 = db.insert_exchange(&new_exchange(carol.id, bob.id)).unwrap();

        db.upsert_rating(e1.id, alice.id, bob.id, 5, None).unwrap();
        db.upsert_rating(e2.id, carol.id, bob.id, 3, None).unwrap();

        assert_eq!(db.average_score_for_user(bob.id).unwrap(), 4.0);
        assert_eq!(db.ratings_for_user(bob.id).unwrap().len(), 2);
    }

    #[test]
    fn unrated_user_averages_zero() {
        let db = test_db();
        let alice = db.create_user(&new_user("a@example.com")).unwrap();
        assert_eq!(db.average_score_for_user(alice.id).unwrap(), 0.0);
    }
}
