// 模型运行时客户端
// 调用本地 Ollama 的 /api/chat 和 /api/tags

use async_trait::async_trait;
use axum::body::Bytes;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("request to model runtime failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("model runtime returned {status}: {body}")]
    Status { status: u16, body: String },
}

pub type ByteStream = BoxStream<'static, Result<Bytes, RuntimeError>>;

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    /// 原样转发给运行时
    pub messages: Vec<Value>,
    pub stream: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuntimeMessage {
    pub role: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatReply {
    pub message: Option<RuntimeMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelTag {
    pub name: String,
    pub modified_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

impl ModelTag {
    /// Unix seconds of `modified_at`, 0 when missing or unparsable.
    pub fn modified_unix(&self) -> i64 {
        self.modified_at
            .as_deref()
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.timestamp())
            .unwrap_or(0)
    }
}

#[async_trait]
pub trait ModelRuntime: Send + Sync {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, RuntimeError>;

    /// Starts a streaming chat and returns the raw NDJSON body.
    async fn chat_stream(&self, request: &ChatRequest) -> Result<ByteStream, RuntimeError>;

    async fn list_models(&self) -> Result<Vec<ModelTag>, RuntimeError>;
}

pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn post_chat(&self, request: &ChatRequest) -> Result<reqwest::Response, RuntimeError> {
        let response = self
            .http
            .post(format!("{}/api/chat", self.base_url))
            .json(request)
            .send()
            .await?;
        ensure_success(response).await
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, RuntimeError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::error!("Ollama API error ({}): {}", status, body);
    Err(RuntimeError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl ModelRuntime for OllamaClient {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, RuntimeError> {
        let response = self.post_chat(request).await?;
        Ok(response.json::<ChatReply>().await?)
    }

    async fn chat_stream(&self, request: &ChatRequest) -> Result<ByteStream, RuntimeError> {
        let response = self.post_chat(request).await?;
        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(RuntimeError::from))
            .boxed())
    }

    async fn list_models(&self) -> Result<Vec<ModelTag>, RuntimeError> {
        let response = self
            .http
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await?;
        let tags = ensure_success(response).await?.json::<TagsResponse>().await?;
        Ok(tags.models)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_modified_at() {
        let tag = ModelTag {
            name: "llama3.2:3b".into(),
            modified_at: Some("2024-05-01T10:00:00.123456789-07:00".into()),
        };
        assert_eq!(tag.modified_unix(), 1714582800);

        let missing = ModelTag {
            name: "x".into(),
            modified_at: Some("yesterday".into()),
        };
        assert_eq!(missing.modified_unix(), 0);
    }

    #[test]
    fn tags_without_models_field_are_empty() {
        let tags: TagsResponse = serde_json::from_str("{}").unwrap();
        assert!(tags.models.is_empty());
    }
}
