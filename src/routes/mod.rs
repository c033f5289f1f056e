pub mod admin;
pub mod gateway;
pub mod keys;

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, patch, post},
};

use crate::{
    AppState,
    middleware::{api_key_auth, auth_middleware, log_errors, rate_limit, require_admin},
};

/// 创建完整路由，所有接口挂在 `api_base_uri` 下
pub fn router(state: AppState) -> Router {
    // API 密钥认证，之后按密钥限流
    let gateway_routes = Router::new()
        .route("/v1/chat/completions", post(gateway::chat_completions))
        .route("/v1/models", get(gateway::list_models))
        .route_layer(from_fn_with_state(state.clone(), rate_limit))
        .route_layer(from_fn_with_state(state.clone(), api_key_auth));

    let key_routes = Router::new()
        .route("/keys", get(keys::list_keys).post(keys::create_key))
        .route(
            "/keys/{key_id}",
            patch(keys::update_key).delete(keys::delete_key),
        )
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    let admin_routes = Router::new()
        .route("/admin/analytics", get(admin::analytics))
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest(
            &state.config.api_base_uri.clone(),
            Router::new()
                .merge(gateway_routes)
                .merge(key_routes)
                .merge(admin_routes),
        )
        .layer(from_fn(log_errors))
        .with_state(state)
}
