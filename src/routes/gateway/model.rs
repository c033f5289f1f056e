use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ollama::{ChatReply, ModelTag};
use crate::usage::estimate_tokens;

#[derive(Debug, Deserialize)]
pub struct CompletionRequest {
    pub model: Option<String>,
    pub messages: Option<Value>,
    pub stream: Option<bool>,
}

/// 拼接所有字符串类型的 content，用于估算 prompt token
pub fn prompt_text(messages: &[Value]) -> String {
    messages
        .iter()
        .filter_map(|m| m.get("content").and_then(Value::as_str))
        .collect()
}

#[derive(Debug, Serialize)]
pub struct CompletionMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct CompletionChoice {
    pub index: u32,
    pub message: CompletionMessage,
    pub finish_reason: &'static str,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct CompletionUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// OpenAI 兼容的 chat.completion 响应
#[derive(Debug, Serialize)]
pub struct CompletionResponse {
    pub id: String,
    pub object: &'static str,
    pub created: i64,
    pub model: String,
    pub choices: Vec<CompletionChoice>,
    pub usage: CompletionUsage,
}

impl CompletionResponse {
    pub fn from_reply(model: String, reply: ChatReply, prompt_tokens: u64) -> Self {
        let now = chrono::Utc::now();
        let message = reply.message.unwrap_or_default();
        let content = message.content.unwrap_or_default();
        let completion_tokens = estimate_tokens(&content);

        Self {
            id: format!("chatcmpl-{}", now.timestamp_millis()),
            object: "chat.completion",
            created: now.timestamp(),
            model,
            choices: vec![CompletionChoice {
                index: 0,
                message: CompletionMessage {
                    role: message.role.unwrap_or_else(|| "assistant".into()),
                    content,
                },
                finish_reason: "stop",
            }],
            usage: CompletionUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ModelObject {
    pub id: String,
    pub object: &'static str,
    pub created: i64,
    pub owned_by: &'static str,
    pub permission: Vec<Value>,
    pub root: String,
    pub parent: Option<String>,
}

impl From<ModelTag> for ModelObject {
    fn from(tag: ModelTag) -> Self {
        Self {
            created: tag.modified_unix(),
            id: tag.name.clone(),
            object: "model",
            owned_by: "ollama",
            permission: Vec::new(),
            root: tag.name,
            parent: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ModelList {
    pub object: &'static str,
    pub data: Vec<ModelObject>,
}
