use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use skillswap_engine::EngineError;

/// Errors surfaced by the HTTP layer.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Engine taxonomy, mapped to status codes in `into_response`.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Missing, malformed, expired, or forged bearer token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Malformed request outside the engine's purview.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Referenced entity absent (server-level lookups).
    #[error("{0}")]
    NotFound(String),

    /// Authenticated but not allowed to act on this entity.
    #[error("{0}")]
    Forbidden(String),

    /// Unexpected failure. Logged; the client gets a generic message.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::Engine(engine) => match engine {
                EngineError::NotFound(_) => (StatusCode::NOT_FOUND, engine.to_string()),
                EngineError::Forbidden(_) => (StatusCode::FORBIDDEN, engine.to_string()),
                EngineError::InvalidState(_)
                | EngineError::InvalidArgument(_)
                | EngineError::InsufficientFunds { .. } => {
                    (StatusCode::BAD_REQUEST, engine.to_string())
                }
                EngineError::Store(e) => {
                    tracing::error!(error = %e, "storage failure");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal server error".to_string(),
                    )
                }
            },
            ServerError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ServerError::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()),
            ServerError::Internal(e) => {
                tracing::error!(error = %e, "internal failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = serde_json::json!({
            "success": false,
            "message": message,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Map raw store errors reached outside the engine (profile reads, catalog
/// queries) onto the HTTP taxonomy.
impl From<skillswap_store::StoreError> for ServerError {
    fn from(e: skillswap_store::StoreError) -> Self {
        match e {
            skillswap_store::StoreError::NotFound => Self::NotFound("Record not found".into()),
            other => Self::Internal(other.to_string()),
        }
    }
}
