//! Rating aggregation.
//!
//! The denormalized `users.average_rating` column is recomputed from the
//! ratings table after every rating upsert, and lazily whenever a profile
//! read notices the stored value has drifted from a fresh computation.

use uuid::Uuid;

use skillswap_store::Database;

use crate::error::Result;

/// Recompute and persist a user's average rating.
///
/// Returns the fresh average (0.0 for an unrated user).
pub fn recompute_average(db: &Database, user_id: Uuid) -> Result<f64> {
    let average = db.average_score_for_user(user_id)?;
    db.set_average_rating(user_id, average)?;
    Ok(average)
}

/// Recompute only when the stored value has drifted.
///
/// Called opportunistically on profile reads so a missed synchronous
/// recompute heals itself the next time anyone looks.
pub fn heal_average(db: &Database, user_id: Uuid, stored: f64) -> Result<f64> {
    let fresh = db.average_score_for_user(user_id)?;
    if (fresh - stored).abs() > f64::EPSILON {
        db.set_average_rating(user_id, fresh)?;
    }
    Ok(fresh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::test_support::{seed_user, setup, terms};
    use skillswap_shared::ExchangeStatus;

    async fn completed_exchange(
        engine: &crate::ExchangeEngine,
        requester: Uuid,
        provider: Uuid,
    ) -> Uuid {
        let exchange = engine
            .create_exchange(requester, provider, terms(10, 1.0))
            .await
            .unwrap();
        engine.accept(exchange.id, provider).await.unwrap();
        engine
            .update_status(exchange.id, requester, ExchangeStatus::Completed)
            .await
            .unwrap();
        exchange.id
    }

    #[tokio::test]
    async fn two_ratings_average_to_their_mean() {
        // Scenario E: scores 5 and 3 from different exchanges -> 4.0.
        let (engine, db, _sink) = setup();
        let alice = seed_user(&db, "alice@example.com", 100).await;
        let carol = seed_user(&db, "carol@example.com", 100).await;
        let bob = seed_user(&db, "bob@example.com", 100).await;

        let e1 = completed_exchange(&engine, alice.id, bob.id).await;
        let e2 = completed_exchange(&engine, carol.id, bob.id).await;

        engine.rate(e1, alice.id, bob.id, 5, Some("great teacher")).await.unwrap();
        engine.rate(e2, carol.id, bob.id, 3, None).await.unwrap();

        let db = db.lock().await;
        assert_eq!(db.get_user(bob.id).unwrap().average_rating, 4.0);
    }

    #[tokio::test]
    async fn rating_directionality_is_enforced() {
        let (engine, db, _sink) = setup();
        let alice = seed_user(&db, "alice@example.com", 100).await;
        let bob = seed_user(&db, "bob@example.com", 100).await;

        let exchange_id = completed_exchange(&engine, alice.id, bob.id).await;

        // The provider cannot rate.
        let err = engine.rate(exchange_id, bob.id, alice.id, 5, None).await.unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));

        // The requester cannot rate themselves or a third party.
        let err = engine.rate(exchange_id, alice.id, alice.id, 5, None).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument(_)));

        // Score bounds are inclusive 1..=5.
        for bad in [0, 6, -1] {
            let err = engine.rate(exchange_id, alice.id, bob.id, bad, None).await.unwrap_err();
            assert!(matches!(err, EngineError::InvalidArgument(_)));
        }

        engine.rate(exchange_id, alice.id, bob.id, 1, None).await.unwrap();
        engine.rate(exchange_id, alice.id, bob.id, 5, None).await.unwrap();
    }

    #[tokio::test]
    async fn only_completed_exchanges_can_be_rated() {
        let (engine, db, _sink) = setup();
        let alice = seed_user(&db, "alice@example.com", 100).await;
        let bob = seed_user(&db, "bob@example.com", 100).await;

        let exchange = engine
            .create_exchange(alice.id, bob.id, terms(10, 1.0))
            .await
            .unwrap();

        let err = engine.rate(exchange.id, alice.id, bob.id, 4, None).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidState(_)));
    }

    #[tokio::test]
    async fn re_rating_replaces_and_reaggregates() {
        let (engine, db, _sink) = setup();
        let alice = seed_user(&db, "alice@example.com", 100).await;
        let bob = seed_user(&db, "bob@example.com", 100).await;

        let exchange_id = completed_exchange(&engine, alice.id, bob.id).await;
        engine.rate(exchange_id, alice.id, bob.id, 2, None).await.unwrap();
        engine.rate(exchange_id, alice.id, bob.id, 4, None).await.unwrap();

        let db = db.lock().await;
        assert_eq!(db.ratings_for_user(bob.id).unwrap().len(), 1);
        assert_eq!(db.get_user(bob.id).unwrap().average_rating, 4.0);
    }

    #[tokio::test]
    async fn stale_average_heals_on_read() {
        let (engine, db, _sink) = setup();
        let alice = seed_user(&db, "alice@example.com", 100).await;
        let bob = seed_user(&db, "bob@example.com", 100).await;

        let exchange_id = completed_exchange(&engine, alice.id, bob.id).await;
        engine.rate(exchange_id, alice.id, bob.id, 5, None).await.unwrap();

        let db = db.lock().await;
        // Simulate drift in the denormalized column.
        db.set_average_rating(bob.id, 1.0).unwrap();

        let healed = heal_average(&db, bob.id, 1.0).unwrap();
        assert_eq!(healed, 5.0);
        assert_eq!(db.get_user(bob.id).unwrap().average_rating, 5.0);
    }
}
