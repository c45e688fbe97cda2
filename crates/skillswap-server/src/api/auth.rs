//! Registration, login, and session endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use skillswap_engine::rating;
use skillswap_shared::auth::{hash_password, verify_password};
use skillswap_shared::ids::generate_public_id;
use skillswap_shared::points::STARTING_BALANCE;
use skillswap_shared::TransactionKind;
use skillswap_store::{NewUser, RatingWithRater, SkillOffering, UserProfile};

use crate::api::{created, ok, ok_with, ApiResponse, AppState};
use crate::auth::AuthUser;
use crate::error::ServerError;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub bio: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub user: UserProfile,
    pub token: String,
}

#[derive(Serialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub user: UserProfile,
    pub skills_offered: Vec<SkillOffering>,
    pub ratings: Vec<RatingWithRater>,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// `POST /api/auth/register`
///
/// Creates the account and credits the sign-up bonus through the ledger, so
/// the new balance is backed by a transaction from day one.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SessionResponse>>), ServerError> {
    if req.name.trim().is_empty() {
        return Err(ServerError::BadRequest("Name is required".into()));
    }
    if !req.email.contains('@') {
        return Err(ServerError::BadRequest("A valid email is required".into()));
    }
    if req.password.len() < 6 {
        return Err(ServerError::BadRequest(
            "Password must be at least 6 characters long".into(),
        ));
    }

    let mut db = state.db.lock().await;

    if db.find_user_by_email(&req.email)?.is_some() {
        return Err(ServerError::BadRequest(
            "User with this email already exists".into(),
        ));
    }

    let user = db.create_user(&NewUser {
        public_id: generate_public_id(),
        name: req.name.trim().to_string(),
        email: req.email.trim().to_string(),
        password_hash: hash_password(&req.password),
        location: req.location,
        bio: req.bio,
    })?;

    db.credit(
        user.id,
        STARTING_BALANCE,
        TransactionKind::Bonus,
        "Sign-up bonus",
        None,
    )?;
    let user = db.get_user(user.id)?;

    tracing::info!(user = %user.id, public_id = %user.public_id, "user registered");

    let token = state.keys.issue(user.id);
    Ok(created(
        "User registered successfully",
        SessionResponse {
            user: user.into(),
            token,
        },
    ))
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<SessionResponse>>, ServerError> {
    let db = state.db.lock().await;

    // Same response for unknown email and wrong password.
    let user = db
        .find_user_by_email(&req.email)?
        .ok_or_else(|| ServerError::Unauthorized("Invalid email or password".into()))?;

    if !verify_password(&req.password, &user.password_hash) {
        return Err(ServerError::Unauthorized("Invalid email or password".into()));
    }

    let token = state.keys.issue(user.id);
    Ok(ok_with(
        "Login successful",
        SessionResponse {
            user: user.into(),
            token,
        },
    ))
}

/// `GET /api/auth/me` -- the caller's own profile, with offerings and
/// received ratings. Heals a stale denormalized average on the way out.
pub async fn me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ApiResponse<ProfileResponse>>, ServerError> {
    let db = state.db.lock().await;

    let mut user = db.get_user(user_id)?;
    user.average_rating = rating::heal_average(&db, user_id, user.average_rating)?;

    Ok(ok(ProfileResponse {
        skills_offered: db.offerings_for_user(user_id)?,
        ratings: db.ratings_for_user(user_id)?,
        user: user.into(),
    }))
}

/// `POST /api/auth/refresh`
pub async fn refresh(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ApiResponse<TokenResponse>>, ServerError> {
    // The account must still exist; tokens are stateless otherwise.
    state.db.lock().await.get_user(user_id)?;

    Ok(ok_with(
        "Token refreshed successfully",
        TokenResponse {
            token: state.keys.issue(user_id),
        },
    ))
}

/// `POST /api/auth/logout` -- tokens are stateless; logout is client-side
/// token disposal. Kept for API symmetry.
pub async fn logout() -> Json<ApiResponse<serde_json::Value>> {
    ok_with("Logout successful", serde_json::Value::Null)
}
