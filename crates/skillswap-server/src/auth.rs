//! Bearer-token authentication for protected routes.
//!
//! The server holds one Ed25519 signing key; tokens are issued at register/
//! login and verified statelessly by the [`AuthUser`] extractor.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::Duration;
use ed25519_dalek::{SigningKey, VerifyingKey};
use uuid::Uuid;

use skillswap_shared::auth;

use crate::api::AppState;
use crate::error::ServerError;

/// Token key material. One per server process.
pub struct AuthKeys {
    signing: SigningKey,
    verifying: VerifyingKey,
    ttl: Duration,
}

impl AuthKeys {
    pub fn new(signing: SigningKey, ttl_days: i64) -> Self {
        let verifying = signing.verifying_key();
        Self {
            signing,
            verifying,
            ttl: Duration::days(ttl_days),
        }
    }

    /// Issue a bearer token for a user.
    pub fn issue(&self, user_id: Uuid) -> String {
        auth::issue_token(user_id, self.ttl, &self.signing)
    }

    /// Verify a bearer token, returning the authenticated user id.
    pub fn verify(&self, token: &str) -> Result<Uuid, auth::AuthError> {
        auth::verify_token(token, &self.verifying)
    }
}

/// Extractor for the authenticated caller on protected routes.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ServerError::Unauthorized("Missing bearer token".into()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ServerError::Unauthorized("Missing bearer token".into()))?;

        let user_id = state
            .keys
            .verify(token)
            .map_err(|e| ServerError::Unauthorized(e.to_string()))?;

        Ok(AuthUser(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn issue_and_verify() {
        let keys = AuthKeys::new(SigningKey::generate(&mut OsRng), 7);
        let user_id = Uuid::new_v4();

        let token = keys.issue(user_id);
        assert_eq!(keys.verify(&token).unwrap(), user_id);
    }

    #[test]
    fn tokens_from_another_server_are_rejected() {
        let keys = AuthKeys::new(SigningKey::generate(&mut OsRng), 7);
        let other = AuthKeys::new(SigningKey::generate(&mut OsRng), 7);

        let token = other.issue(Uuid::new_v4());
        assert!(keys.verify(&token).is_err());
    }
}
