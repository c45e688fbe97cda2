//! Skill catalog and teacher search endpoints. All public reads.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use skillswap_store::skills::TeacherSearchFilters;
use skillswap_store::{RatingWithRater, Skill, TeacherMatch};

use crate::api::{created, ok, ApiResponse, AppState};
use crate::error::ServerError;

fn default_limit() -> u32 {
    20
}

#[derive(Deserialize)]
pub struct TeacherSearchQuery {
    #[serde(default)]
    pub skill: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub skill_level: Option<String>,
    #[serde(default)]
    pub min_rating: Option<f64>,
    #[serde(default)]
    pub max_hourly_rate: Option<i64>,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

#[derive(Deserialize)]
pub struct CreateSkillRequest {
    pub name: String,
    pub category: String,
    pub skill_level: String,
    #[serde(default)]
    pub hourly_rate: i64,
}

/// `GET /api/skills/available`
pub async fn available(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Skill>>>, ServerError> {
    let db = state.db.lock().await;
    Ok(ok(db.list_skills()?))
}

/// `GET /api/skills/categories`
pub async fn categories(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<String>>>, ServerError> {
    let db = state.db.lock().await;
    Ok(ok(db.skill_categories()?))
}

/// `GET /api/skills/filters` -- the filter vocabulary the search UI offers.
pub async fn search_filters(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ServerError> {
    let db = state.db.lock().await;
    Ok(ok(serde_json::json!({
        "categories": db.skill_categories()?,
        "skill_levels": ["Beginner", "Intermediate", "Advanced", "Expert"],
        "max_hourly_rate": 100,
    })))
}

/// `GET /api/skills/search` -- find teachers by skill criteria.
pub async fn search_teachers(
    State(state): State<AppState>,
    Query(query): Query<TeacherSearchQuery>,
) -> Result<Json<ApiResponse<Vec<TeacherMatch>>>, ServerError> {
    let db = state.db.lock().await;
    let teachers = db.search_teachers(&TeacherSearchFilters {
        skill: query.skill,
        category: query.category,
        location: query.location,
        skill_level: query.skill_level,
        min_rating: query.min_rating,
        max_hourly_rate: query.max_hourly_rate,
        limit: query.limit,
        offset: query.offset,
    })?;
    Ok(ok(teachers))
}

/// `POST /api/skills` -- add a catalog entry.
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateSkillRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Skill>>), ServerError> {
    if req.name.trim().is_empty() || req.category.trim().is_empty() {
        return Err(ServerError::BadRequest(
            "Skill name and category are required".into(),
        ));
    }

    let db = state.db.lock().await;
    let skill = db.create_skill(
        req.name.trim(),
        req.category.trim(),
        &req.skill_level,
        req.hourly_rate,
    )?;
    Ok(created("Skill created successfully", skill))
}

/// `GET /api/skills/category/:category`
pub async fn by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<ApiResponse<Vec<Skill>>>, ServerError> {
    let db = state.db.lock().await;
    Ok(ok(db.skills_by_category(&category)?))
}

/// `GET /api/skills/teacher/:id/reviews` -- a teacher's received ratings.
pub async fn teacher_reviews(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<RatingWithRater>>>, ServerError> {
    let db = state.db.lock().await;
    Ok(ok(db.ratings_for_user(id)?))
}
