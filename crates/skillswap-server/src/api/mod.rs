//! HTTP API: router assembly and the response envelope.
//!
//! Every endpoint answers `{"success": ..., "message": ..., "data": ...}`;
//! errors go through [`ServerError`]'s `IntoResponse` with the same shape.

pub mod auth;
pub mod exchanges;
pub mod notifications;
pub mod skills;
pub mod users;

use std::sync::Arc;

use axum::extract::State;
use axum::http::{Method, StatusCode};
use axum::routing::{delete, get, post, put};
use axum::{middleware, Json, Router};
use serde::Serialize;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use skillswap_engine::ExchangeEngine;
use skillswap_store::Database;

use crate::auth::AuthKeys;
use crate::config::ServerConfig;
use crate::rate_limit::{rate_limit_middleware, RateLimiter};
use crate::realtime::{ws_handler, Dispatcher};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub engine: Arc<ExchangeEngine>,
    pub dispatcher: Dispatcher,
    pub keys: Arc<AuthKeys>,
    pub config: Arc<ServerConfig>,
}

/// Uniform response envelope.
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

/// 200 with data.
pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        message: None,
        data,
    })
}

/// 200 with a human-readable message and data.
pub fn ok_with<T: Serialize>(message: &str, data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        message: Some(message.to_string()),
        data,
    })
}

/// 201 with a human-readable message and data.
pub fn created<T: Serialize>(message: &str, data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, ok_with(message, data))
}

pub fn build_router(state: AppState, limiter: RateLimiter) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health_check))
        // Auth
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/refresh", post(auth::refresh))
        .route("/api/auth/logout", post(auth::logout))
        // Users
        .route("/api/users/search", get(users::search))
        .route("/api/users/my-transactions", get(users::my_transactions))
        .route("/api/users/:id", get(users::profile).put(users::update_profile))
        .route("/api/users/:id/skills/offered", post(users::add_offering))
        .route("/api/users/:id/transactions", get(users::user_transactions))
        // Exchanges
        .route("/api/exchanges/create", post(exchanges::create))
        .route(
            "/api/exchanges/create-teacher-request",
            post(exchanges::create_teacher_request),
        )
        .route("/api/exchanges", get(exchanges::my_exchanges))
        .route("/api/exchanges/my-exchanges", get(exchanges::my_exchanges))
        .route("/api/exchanges/:id", get(exchanges::detail))
        .route("/api/exchanges/:id/accept", put(exchanges::accept))
        .route("/api/exchanges/:id/decline", put(exchanges::decline))
        .route("/api/exchanges/:id/revoke", put(exchanges::revoke))
        .route("/api/exchanges/:id/status", put(exchanges::update_status))
        .route("/api/exchanges/:id/message", post(exchanges::send_message))
        .route("/api/exchanges/:id/rate", post(exchanges::rate))
        // Skill catalog
        .route("/api/skills", post(skills::create))
        .route("/api/skills/available", get(skills::available))
        .route("/api/skills/categories", get(skills::categories))
        .route("/api/skills/filters", get(skills::search_filters))
        .route("/api/skills/search", get(skills::search_teachers))
        .route("/api/skills/category/:category", get(skills::by_category))
        .route("/api/skills/teacher/:id/reviews", get(skills::teacher_reviews))
        // Notifications
        .route("/api/notifications", get(notifications::list))
        .route(
            "/api/notifications/mark-all-read",
            put(notifications::mark_all_read),
        )
        .route(
            "/api/notifications/unread-count",
            get(notifications::unread_count),
        )
        .route(
            "/api/notifications/:id/read",
            put(notifications::mark_read),
        )
        .route("/api/notifications/:id", delete(notifications::remove))
        // Realtime
        .route("/ws", get(ws_handler))
        .layer(middleware::from_fn_with_state(limiter, rate_limit_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    instance: String,
    version: &'static str,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        instance: state.config.instance_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
    })
}
