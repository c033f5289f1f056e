use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use chat_gateway::{
    AppState,
    config::Config,
    database::{ApiKeyOperation, UsageOperation},
    ollama::OllamaClient,
    rate_limit::RedisCounterStore,
    routes,
};
use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(
        "Rate limit: {} requests per {} ms",
        config.rate_limit_requests,
        config.rate_limit_window_ms
    );

    // 设置数据库连接池
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'chat_gateway';").await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");
    let pool = Arc::new(pool);

    // 设置 Redis 客户端，限流计数器放在 Redis 中供多实例共享
    let redis_client =
        redis::Client::open(config.redis_url.clone()).expect("Failed to create Redis client");
    let counters = RedisCounterStore::new(Arc::new(redis_client));

    let runtime = OllamaClient::new(&config.llm_api_base_url);
    tracing::info!("Forwarding model calls to {}", config.llm_api_base_url);

    // 设置应用状态
    let state = AppState::new(
        config.clone(),
        Arc::new(ApiKeyOperation::new(pool.clone())),
        Arc::new(UsageOperation::new(pool)),
        Arc::new(counters),
        Arc::new(runtime),
    );

    let router = routes::router(state);

    // 根据编译模式决定是否添加CORS
    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(tower_http::cors::CorsLayer::permissive())
    };

    // 启动服务器
    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        router,
    )
    .await
    .expect("Failed to start server");
}
