use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::middleware::{LIMIT_HEADER, REMAINING_HEADER};

/// 存储层错误：Redis 计数器、Postgres 表
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt record: {0}")]
    Corrupt(String),
    #[error("store unavailable")]
    Unavailable,
}

#[derive(Debug)]
pub enum AppError {
    MissingApiKey,
    InvalidApiKey,
    Unauthorized,
    RateLimited { limit: u32 },
    InvalidMessages,
    NotFound(&'static str),
    BadRequest(String),
    FailedToFetchModels,
    InternalServerError,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::MissingApiKey => (StatusCode::UNAUTHORIZED, "Missing or invalid API key".into()),
            AppError::InvalidApiKey => (StatusCode::UNAUTHORIZED, "Invalid API key".into()),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".into()),
            AppError::RateLimited { limit } => {
                let body = Json(ErrorResponse {
                    error: "Rate limit exceeded".into(),
                });
                return (
                    StatusCode::TOO_MANY_REQUESTS,
                    [
                        (LIMIT_HEADER, limit.to_string()),
                        (REMAINING_HEADER, "0".to_string()),
                    ],
                    body,
                )
                    .into_response();
            }
            AppError::InvalidMessages => (StatusCode::BAD_REQUEST, "Invalid messages format".into()),
            AppError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{} not found", what)),
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            AppError::FailedToFetchModels => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch models".into())
            }
            AppError::InternalServerError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".into())
            }
        };

        (status, Json(ErrorResponse { error })).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        tracing::error!("Store error: {}", e);
        AppError::InternalServerError
    }
}
