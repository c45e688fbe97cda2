//! User profile, search, offering, and ledger-history endpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use skillswap_engine::rating;
use skillswap_store::users::UserSearchFilters;
use skillswap_store::{
    ProfileUpdate, SkillOffering, StoreError, TransactionWithExchange, UserProfile,
};

use crate::api::auth::ProfileResponse;
use crate::api::{created, ok, ok_with, ApiResponse, AppState};
use crate::auth::AuthUser;
use crate::error::ServerError;

fn default_limit() -> u32 {
    20
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    50
}

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub skill: Option<String>,
    #[serde(default)]
    pub min_rating: Option<f64>,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

#[derive(Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub limit: u32,
}

#[derive(Deserialize)]
pub struct AddOfferingRequest {
    pub skill_id: Uuid,
    pub skill_level: String,
    #[serde(default)]
    pub hourly_rate: i64,
    #[serde(default)]
    pub description: String,
}

#[derive(Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub pages: i64,
}

#[derive(Serialize)]
pub struct TransactionPage {
    pub transactions: Vec<TransactionWithExchange>,
    pub pagination: Pagination,
}

/// `GET /api/users/search` -- public directory search.
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<Vec<UserProfile>>>, ServerError> {
    let db = state.db.lock().await;
    let users = db.search_users(&UserSearchFilters {
        search: query.search,
        location: query.location,
        skill: query.skill,
        min_rating: query.min_rating,
        limit: query.limit,
        offset: query.offset,
    })?;
    Ok(ok(users))
}

/// `GET /api/users/:id` -- public profile with offerings and ratings.
/// Heals a stale denormalized average on the way out.
pub async fn profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ProfileResponse>>, ServerError> {
    let db = state.db.lock().await;

    let mut user = db.get_user(id).map_err(|e| match e {
        StoreError::NotFound => ServerError::NotFound("User not found".into()),
        other => other.into(),
    })?;
    user.average_rating = rating::heal_average(&db, id, user.average_rating)?;

    Ok(ok(ProfileResponse {
        skills_offered: db.offerings_for_user(id)?,
        ratings: db.ratings_for_user(id)?,
        user: user.into(),
    }))
}

/// `PUT /api/users/:id` -- own profile only. Balance, rating, and credential
/// fields are not part of the schema, so they cannot be written here.
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<ApiResponse<UserProfile>>, ServerError> {
    if user_id != id {
        return Err(ServerError::Forbidden(
            "Not authorized to update this profile".into(),
        ));
    }

    let db = state.db.lock().await;
    let user = db.update_profile(id, &update)?;
    Ok(ok_with("Profile updated successfully", user.into()))
}

/// `POST /api/users/:id/skills/offered` -- upsert an offering on the
/// caller's own profile.
pub async fn add_offering(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<AddOfferingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SkillOffering>>), ServerError> {
    if user_id != id {
        return Err(ServerError::Forbidden(
            "Not authorized to add skills to this profile".into(),
        ));
    }
    if req.skill_level.trim().is_empty() {
        return Err(ServerError::BadRequest("Skill level is required".into()));
    }

    let db = state.db.lock().await;

    db.get_skill(req.skill_id).map_err(|e| match e {
        StoreError::NotFound => ServerError::NotFound("Skill not found".into()),
        other => other.into(),
    })?;

    let offering = db.upsert_offering(
        id,
        req.skill_id,
        &req.skill_level,
        req.hourly_rate,
        &req.description,
    )?;
    Ok(created("Skill added successfully", offering))
}

/// `GET /api/users/my-transactions` -- paginated ledger history.
pub async fn my_transactions(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<TransactionPage>>, ServerError> {
    let page = query.page.max(1);
    let limit = query.limit.clamp(1, 200);
    let offset = (page - 1) * limit;

    let db = state.db.lock().await;
    let transactions = db.transactions_for_user(user_id, limit, offset)?;
    let total = db.transaction_count_for_user(user_id)?;

    Ok(ok(TransactionPage {
        transactions,
        pagination: Pagination {
            page,
            limit,
            total,
            pages: (total + i64::from(limit) - 1) / i64::from(limit),
        },
    }))
}

/// `GET /api/users/:id/transactions` -- owner only.
pub async fn user_transactions(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<TransactionWithExchange>>>, ServerError> {
    if user_id != id {
        return Err(ServerError::Forbidden(
            "Not authorized to view these transactions".into(),
        ));
    }

    let db = state.db.lock().await;
    Ok(ok(db.transactions_for_user(id, 50, 0)?))
}
