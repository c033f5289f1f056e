use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::{AppState, error::AppError, utils::bearer_token};

/// 已通过校验的 API 密钥
#[derive(Debug, Clone)]
pub struct ApiKeyContext {
    pub key_id: String,
    pub user_id: String,
    pub key: String,
}

pub async fn api_key_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let key = bearer_token(req.headers()).ok_or(AppError::MissingApiKey)?;

    let entity = match state.api_keys.find_by_key(&key).await? {
        Some(entity) if entity.is_active => entity,
        _ => return Err(AppError::InvalidApiKey),
    };

    req.extensions_mut().insert(ApiKeyContext {
        key_id: entity.id,
        user_id: entity.user_id,
        key,
    });
    Ok(next.run(req).await)
}
