use axum::{
    body::Body,
    extract::{Extension, State},
    http::{HeaderValue, Request},
    middleware::Next,
    response::Response,
};

use super::api_key::ApiKeyContext;
use crate::{AppState, error::AppError};

pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// 按 API 密钥限流，必须在 `api_key_auth` 之后运行
///
/// Rejected requests never reach the handler. Successful responses carry the
/// limit and remaining quota headers.
pub async fn rate_limit(
    State(state): State<AppState>,
    Extension(ctx): Extension<ApiKeyContext>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let limit = state.limiter.limit();
    let decision = state.limiter.check_and_consume(&ctx.key).await;

    if !decision.allowed() {
        tracing::info!("Rate limit exceeded for key {}", ctx.key_id);
        return Err(AppError::RateLimited { limit });
    }

    let mut response = next.run(req).await;
    if response.status().is_success() {
        let headers = response.headers_mut();
        headers.insert(LIMIT_HEADER, HeaderValue::from(limit));
        headers.insert(REMAINING_HEADER, HeaderValue::from(decision.remaining()));
    }
    Ok(response)
}
