//! Notification read/unread endpoints. All owner-scoped.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use skillswap_store::Notification;

use crate::api::{ok, ok_with, ApiResponse, AppState};
use crate::auth::AuthUser;
use crate::error::ServerError;

fn default_limit() -> u32 {
    50
}

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

#[derive(Serialize)]
pub struct UnreadCount {
    pub unread_count: i64,
}

/// `GET /api/notifications`
pub async fn list(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<Notification>>>, ServerError> {
    let db = state.db.lock().await;
    Ok(ok(db.notifications_for_user(user_id, query.limit.clamp(1, 200))?))
}

/// `PUT /api/notifications/:id/read`
pub async fn mark_read(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ServerError> {
    let db = state.db.lock().await;
    if !db.mark_notification_read(id, user_id)? {
        return Err(ServerError::NotFound("Notification not found".into()));
    }
    Ok(ok_with("Notification marked as read", serde_json::Value::Null))
}

/// `PUT /api/notifications/mark-all-read`
pub async fn mark_all_read(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ApiResponse<serde_json::Value>>, ServerError> {
    let db = state.db.lock().await;
    db.mark_all_notifications_read(user_id)?;
    Ok(ok_with("All notifications marked as read", serde_json::Value::Null))
}

/// `GET /api/notifications/unread-count`
pub async fn unread_count(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<ApiResponse<UnreadCount>>, ServerError> {
    let db = state.db.lock().await;
    Ok(ok(UnreadCount {
        unread_count: db.unread_notification_count(user_id)?,
    }))
}

/// `DELETE /api/notifications/:id`
pub async fn remove(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ServerError> {
    let db = state.db.lock().await;
    if !db.delete_notification(id, user_id)? {
        return Err(ServerError::NotFound("Notification not found".into()));
    }
    Ok(ok_with("Notification deleted successfully", serde_json::Value::Null))
}
