use axum::{
    body::Body,
    extract::{Extension, State},
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::{
    AppState,
    error::AppError,
    utils::{Claims, bearer_token, verify_token},
};

/// 校验用户 JWT，并把 Claims 放进请求扩展
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers()).ok_or(AppError::Unauthorized)?;

    let claims = verify_token(&token, &state.config).map_err(|e| {
        tracing::debug!("Rejected user token: {}", e);
        AppError::Unauthorized
    })?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// 必须在 `auth_middleware` 之后运行
pub async fn require_admin(
    Extension(claims): Extension<Claims>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    if !claims.is_admin() {
        tracing::warn!("User {} attempted an admin route", claims.sub);
        return Err(AppError::Unauthorized);
    }
    Ok(next.run(req).await)
}
