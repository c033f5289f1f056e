use axum::{
    Json,
    body::Bytes,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};

use super::model::{
    ApiKeyListResponse, ApiKeyResponse, ApiKeyView, CreateKeyRequest, DeleteKeyResponse,
    UpdateKeyRequest,
};
use crate::{
    AppState,
    database::ApiKeyEntity,
    error::AppError,
    utils::{Claims, parse_body, parse_body_or_default},
};

#[axum::debug_handler]
pub async fn list_keys(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ApiKeyListResponse>, AppError> {
    let api_keys = state.api_keys.list_for_user(&claims.sub).await?;
    Ok(Json(ApiKeyListResponse {
        api_keys: api_keys.into_iter().map(ApiKeyView::from).collect(),
    }))
}

#[axum::debug_handler]
pub async fn create_key(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let req: CreateKeyRequest = parse_body_or_default(&body)?;
    let api_key = ApiKeyEntity::new(&claims.sub, req.name);

    state.api_keys.insert(&api_key).await?;
    tracing::info!("Created API key {} for user {}", api_key.id, claims.sub);

    Ok((
        StatusCode::CREATED,
        Json(ApiKeyResponse {
            api_key: api_key.into(),
        }),
    ))
}

#[axum::debug_handler]
pub async fn update_key(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(key_id): Path<String>,
    body: Bytes,
) -> Result<Json<ApiKeyResponse>, AppError> {
    let req: UpdateKeyRequest = parse_body(&body)?;

    let api_key = state
        .api_keys
        .set_active(&key_id, &claims.sub, req.is_active)
        .await?
        .ok_or(AppError::NotFound("API key"))?;

    Ok(Json(ApiKeyResponse {
        api_key: api_key.into(),
    }))
}

#[axum::debug_handler]
pub async fn delete_key(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(key_id): Path<String>,
) -> Result<Json<DeleteKeyResponse>, AppError> {
    if !state.api_keys.delete(&key_id, &claims.sub).await? {
        return Err(AppError::NotFound("API key"));
    }

    tracing::info!("Deleted API key {} of user {}", key_id, claims.sub);
    Ok(Json(DeleteKeyResponse { success: true }))
}
