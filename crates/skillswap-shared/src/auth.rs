//! Bearer tokens and password hashing.
//!
//! A token is an Ed25519 signature over `user_id || expires_at`, issued by
//! the server's signing key at login/registration and presented back on every
//! protected request. Verification is a pure function of the token and the
//! server's public key, so no session state is stored.
//!
//! Passwords are stored as `salt$digest` where `digest = blake3(salt || password)`
//! with a random 16-byte salt. Comparison is constant-time.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Malformed token")]
    Malformed,

    #[error("Token expired")]
    Expired,

    #[error("Invalid signature")]
    BadSignature,
}

/// A signed bearer token, serialized as URL-safe base64 of its JSON form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthToken {
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub signature: Vec<u8>,
}

fn token_payload(user_id: &Uuid, expires_at: &DateTime<Utc>) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(user_id.as_bytes());
    payload.extend_from_slice(expires_at.to_rfc3339().as_bytes());
    payload
}

/// Issue a token for `user_id` valid for `ttl`.
pub fn issue_token(user_id: Uuid, ttl: Duration, signing_key: &SigningKey) -> String {
    let expires_at = Utc::now() + ttl;
    let signature = signing_key.sign(&token_payload(&user_id, &expires_at));

    let token = AuthToken {
        user_id,
        expires_at,
        signature: signature.to_bytes().to_vec(),
    };

    // Serializing our own struct cannot fail.
    let json = serde_json::to_vec(&token).expect("token serialization");
    URL_SAFE_NO_PAD.encode(json)
}

/// Verify an encoded token and return the authenticated user id.
pub fn verify_token(encoded: &str, verifying_key: &VerifyingKey) -> Result<Uuid, AuthError> {
    let json = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|_| AuthError::Malformed)?;
    let token: AuthToken = serde_json::from_slice(&json).map_err(|_| AuthError::Malformed)?;

    if Utc::now() > token.expires_at {
        return Err(AuthError::Expired);
    }

    let signature = Signature::from_slice(&token.signature).map_err(|_| AuthError::Malformed)?;
    verifying_key
        .verify(&token_payload(&token.user_id, &token.expires_at), &signature)
        .map_err(|_| AuthError::BadSignature)?;

    Ok(token.user_id)
}

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    let digest = salted_digest(&salt, password);
    format!("{}${}", hex::encode(salt), hex::encode(digest))
}

/// Check a password against a stored `salt$digest` hash in constant time.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_hex, digest_hex)) = stored.split_once('$') else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (hex::decode(salt_hex), hex::decode(digest_hex)) else {
        return false;
    };

    let digest = salted_digest(&salt, password);
    digest.as_slice().ct_eq(expected.as_slice()).unwrap_u8() == 1
}

fn salted_digest(salt: &[u8], password: &str) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    *hasher.finalize().as_bytes()
}
