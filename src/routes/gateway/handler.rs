use std::time::Instant;

use axum::{
    Json,
    body::{Body, Bytes},
    extract::{Extension, OriginalUri, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::Value;

use super::model::{CompletionRequest, CompletionResponse, ModelList, ModelObject, prompt_text};
use crate::{
    AppState,
    database::UsageEventInput,
    error::AppError,
    middleware::ApiKeyContext,
    ollama::ChatRequest,
    usage::estimate_tokens,
    utils::parse_body,
};

// 更新密钥最近使用时间，失败只记录日志
async fn touch_key(state: &AppState, ctx: &ApiKeyContext) {
    if let Err(e) = state.api_keys.touch(&ctx.key_id, Utc::now()).await {
        tracing::warn!("Failed to update last_used for key {}: {}", ctx.key_id, e);
    }
}

#[axum::debug_handler]
pub async fn chat_completions(
    State(state): State<AppState>,
    Extension(ctx): Extension<ApiKeyContext>,
    OriginalUri(uri): OriginalUri,
    body: Bytes,
) -> Result<Response, AppError> {
    touch_key(&state, &ctx).await;

    let req: CompletionRequest = parse_body(&body)?;
    let messages = match req.messages {
        Some(Value::Array(messages)) => messages,
        _ => return Err(AppError::InvalidMessages),
    };
    let model = req
        .model
        .unwrap_or_else(|| state.config.default_model.clone());
    let stream = req.stream.unwrap_or(false);

    let prompt_tokens = estimate_tokens(&prompt_text(&messages));
    let chat = ChatRequest {
        model: model.clone(),
        messages,
        stream,
    };

    if stream {
        let started = Instant::now();
        let body = state.runtime.chat_stream(&chat).await.map_err(|e| {
            tracing::error!("Chat completions error: {}", e);
            AppError::InternalServerError
        })?;
        let elapsed = started.elapsed();

        state.tracker.spawn_record(UsageEventInput {
            user_id: ctx.user_id,
            model,
            prompt_tokens: Some(prompt_tokens),
            completion_tokens: None,
            response_time_ms: elapsed.as_millis() as u64,
            endpoint: uri.path().to_string(),
        });

        return Ok((
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/event-stream"),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            Body::from_stream(body),
        )
            .into_response());
    }

    let started = Instant::now();
    let reply = state.runtime.chat(&chat).await.map_err(|e| {
        tracing::error!("Chat completions error: {}", e);
        AppError::InternalServerError
    })?;
    let elapsed = started.elapsed();

    let response = CompletionResponse::from_reply(model.clone(), reply, prompt_tokens);
    state.tracker.spawn_record(UsageEventInput {
        user_id: ctx.user_id,
        model,
        prompt_tokens: Some(response.usage.prompt_tokens),
        completion_tokens: Some(response.usage.completion_tokens),
        response_time_ms: elapsed.as_millis() as u64,
        endpoint: uri.path().to_string(),
    });

    Ok(Json(response).into_response())
}

#[axum::debug_handler]
pub async fn list_models(
    State(state): State<AppState>,
    Extension(ctx): Extension<ApiKeyContext>,
) -> Result<Json<ModelList>, AppError> {
    touch_key(&state, &ctx).await;

    let tags = state.runtime.list_models().await.map_err(|e| {
        tracing::error!("Failed to fetch models from Ollama: {}", e);
        AppError::FailedToFetchModels
    })?;

    Ok(Json(ModelList {
        object: "list",
        data: tags.into_iter().map(ModelObject::from).collect(),
    }))
}
