use std::env;
use std::time::Duration;

pub const DEFAULT_RATE_LIMIT_REQUESTS: u32 = 100;
pub const DEFAULT_RATE_LIMIT_WINDOW_MS: u64 = 60_000;
const DEFAULT_LLM_API_BASE_URL: &str = "http://model-runner:11434";
const DEFAULT_MODEL: &str = "llama3.2:3b";

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub jwt_secret: String,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    pub llm_api_base_url: String,
    pub default_model: String,
    pub rate_limit_requests: u32,
    pub rate_limit_window_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        Ok(Config {
            database_url: env::var("DATABASE_URL")?,
            redis_url: env::var("REDIS_URL")?,
            jwt_secret: env::var("JWT_SECRET")?,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "::".into()),
            server_port: parse_or("SERVER_PORT", 3000),
            api_base_uri: env::var("API_BASE_URI").unwrap_or_else(|_| "/api".into()),
            llm_api_base_url: normalize_base_url(
                &env::var("LLM_API_BASE_URL").unwrap_or_else(|_| DEFAULT_LLM_API_BASE_URL.into()),
            ),
            default_model: env::var("DEFAULT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into()),
            rate_limit_requests: parse_or("RATE_LIMIT_REQUESTS", DEFAULT_RATE_LIMIT_REQUESTS),
            rate_limit_window_ms: window_or_default(parse_or(
                "RATE_LIMIT_WINDOW",
                DEFAULT_RATE_LIMIT_WINDOW_MS,
            )),
        })
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_millis(self.rate_limit_window_ms)
    }
}

// 未设置或解析失败时使用默认值
fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

// 窗口必须能以毫秒时间戳（i64）表示
fn window_or_default(window_ms: u64) -> u64 {
    if i64::try_from(window_ms).is_ok() {
        window_ms
    } else {
        tracing::warn!(
            "RATE_LIMIT_WINDOW {} is out of range, using {}",
            window_ms,
            DEFAULT_RATE_LIMIT_WINDOW_MS
        );
        DEFAULT_RATE_LIMIT_WINDOW_MS
    }
}

/// Ollama 原生接口不在 `/v1` 下，去掉 OpenAI 兼容前缀
pub fn normalize_base_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    trimmed
        .strip_suffix("/v1")
        .unwrap_or(trimmed)
        .to_string()
}

#[cfg(test)]
impl Config {
    pub fn for_tests() -> Self {
        Config {
            database_url: "postgres://localhost/test".into(),
            redis_url: "redis://localhost".into(),
            jwt_secret: "test-secret".into(),
            server_host: "127.0.0.1".into(),
            server_port: 3000,
            api_base_uri: "/api".into(),
            llm_api_base_url: DEFAULT_LLM_API_BASE_URL.into(),
            default_model: DEFAULT_MODEL.into(),
            rate_limit_requests: 3,
            rate_limit_window_ms: 1000,
        }
    }
}
