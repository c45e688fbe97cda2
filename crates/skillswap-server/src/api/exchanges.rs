//! Exchange lifecycle endpoints. Thin adapters over the engine: parse and
//! validate the payload, hand the authenticated caller to the engine, wrap
//! the result in the response envelope.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use skillswap_engine::exchange::ExchangeDetail;
use skillswap_engine::ExchangeTerms;
use skillswap_shared::ExchangeStatus;
use skillswap_store::{Exchange, ExchangeWithParties, MessageWithSender, RatingWithRater};

use crate::api::{created, ok, ok_with, ApiResponse, AppState};
use crate::auth::AuthUser;
use crate::error::ServerError;

fn default_skill_level() -> String {
    "Beginner".to_string()
}

fn default_session_type() -> String {
    "Exchange".to_string()
}

fn default_duration() -> f64 {
    1.0
}

#[derive(Deserialize)]
pub struct CreateExchangeRequest {
    pub provider_id: Uuid,
    pub skill_id: Uuid,
    pub skill: String,
    #[serde(default = "default_skill_level")]
    pub skill_level: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_session_type")]
    pub session_type: String,
    #[serde(default)]
    pub hourly_rate: i64,
    #[serde(default)]
    pub scheduled_date: Option<DateTime<Utc>>,
    #[serde(default = "default_duration")]
    pub duration_hours: f64,
    #[serde(default)]
    pub is_mutual: bool,
}

#[derive(Deserialize)]
pub struct TeacherRequestRequest {
    pub student_id: Uuid,
    pub skill_id: Uuid,
    pub skill: String,
    #[serde(default = "default_skill_level")]
    pub skill_level: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_session_type")]
    pub session_type: String,
    #[serde(default)]
    pub hourly_rate: i64,
    #[serde(default)]
    pub scheduled_date: Option<DateTime<Utc>>,
    #[serde(default = "default_duration")]
    pub duration_hours: f64,
    #[serde(default)]
    pub is_mutual: bool,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
    #[serde(default)]
    pub message_type: Option<String>,
}

#[derive(Deserialize)]
pub struct RateRequest {
    pub rated_user_id: Uuid,
    pub score: i64,
    #[serde(default)]
    pub review_text: Option<String>,
}

/// `POST /api/exchanges/create` -- learner asks a teacher.
pub async fn create(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<CreateExchangeRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Exchange>>), ServerError> {
    let exchange = state
        .engine
        .create_exchange(
            user_id,
            req.provider_id,
            ExchangeTerms {
                skill_id: req.skill_id,
                skill: req.skill,
                skill_level: req.skill_level,
                description: req.description,
                session_type: req.session_type,
                hourly_rate: req.hourly_rate,
                scheduled_date: req.scheduled_date,
                duration_hours: req.duration_hours,
                is_mutual: req.is_mutual,
            },
        )
        .await?;

    Ok(created("Exchange request created successfully", exchange))
}

/// `POST /api/exchanges/create-teacher-request` -- teacher invites a student.
pub async fn create_teacher_request(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<TeacherRequestRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Exchange>>), ServerError> {
    let exchange = state
        .engine
        .create_teacher_request(
            user_id,
            req.student_id,
            ExchangeTerms {
                skill_id: req.skill_id,
                skill: req.skill,
                skill_level: req.skill_level,
                description: req.description,
                session_type: req.session_type,
                hourly_rate: req.hourly_rate,
                scheduled_date: req.scheduled_date,
                duration_hours: req.duration_hours,
                is_mutual: req.is_mutual,
            },
        )
        .await?;

    Ok(created("Exchange request created successfully", exchange))
}

/// `GET /api/exchanges/my-exchanges` (also mounted at `GET /api/exchanges`).
pub async fn my_exchanges(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ApiResponse<Vec<ExchangeWithParties>>>, ServerError> {
    Ok(ok(state.engine.my_exchanges(user_id).await?))
}

/// `GET /api/exchanges/:id` -- detail with messages and ratings.
pub async fn detail(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<ExchangeDetail>>, ServerError> {
    Ok(ok(state.engine.exchange_detail(id, user_id).await?))
}

/// `PUT /api/exchanges/:id/accept`
pub async fn accept(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Exchange>>, ServerError> {
    let exchange = state.engine.accept(id, user_id).await?;
    Ok(ok_with("Exchange accepted successfully", exchange))
}

/// `PUT /api/exchanges/:id/decline`
pub async fn decline(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Exchange>>, ServerError> {
    let exchange = state.engine.decline(id, user_id).await?;
    Ok(ok_with("Exchange declined successfully", exchange))
}

/// `PUT /api/exchanges/:id/revoke`
pub async fn revoke(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Exchange>>, ServerError> {
    let exchange = state.engine.revoke(id, user_id).await?;
    Ok(ok_with("Exchange request revoked successfully", exchange))
}

/// `PUT /api/exchanges/:id/status`
pub async fn update_status(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<Exchange>>, ServerError> {
    let status = ExchangeStatus::parse(&req.status)
        .ok_or_else(|| ServerError::BadRequest("Invalid status".into()))?;

    let exchange = state.engine.update_status(id, user_id, status).await?;
    Ok(ok_with("Exchange status updated successfully", exchange))
}

/// `POST /api/exchanges/:id/message`
pub async fn send_message(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MessageWithSender>>), ServerError> {
    let message = state
        .engine
        .send_message(id, user_id, &req.content, req.message_type.as_deref())
        .await?;

    Ok(created("Message sent successfully", message))
}

/// `POST /api/exchanges/:id/rate`
pub async fn rate(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<RateRequest>,
) -> Result<(StatusCode, Json<ApiResponse<RatingWithRater>>), ServerError> {
    let rating = state
        .engine
        .rate(id, user_id, req.rated_user_id, req.score, req.review_text.as_deref())
        .await?;

    Ok(created("Rating submitted successfully", rating))
}
