// API 密钥实体
// 对应数据库中的 api_keys 表

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

pub const API_KEY_PREFIX: &str = "cc_";
pub const DEFAULT_API_KEY_NAME: &str = "API Key";

#[derive(Debug, Clone, FromRow, PartialEq, Eq)]
pub struct ApiKeyEntity {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub key: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_used: Option<DateTime<Utc>>,
}

/// 生成新的密钥：`cc_` 加 32 位十六进制
pub fn generate_api_key() -> String {
    format!("{}{}", API_KEY_PREFIX, Uuid::new_v4().simple())
}

impl ApiKeyEntity {
    pub fn new(user_id: &str, name: Option<String>) -> Self {
        let name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| DEFAULT_API_KEY_NAME.to_string());

        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            name,
            key: generate_api_key(),
            is_active: true,
            created_at: Utc::now(),
            last_used: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_have_prefix_and_hex_body() {
        let key = generate_api_key();
        assert!(key.starts_with("cc_"));
        let body = &key[3..];
        assert_eq!(body.len(), 32);
        assert!(body.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(key, generate_api_key());
    }

    #[test]
    fn blank_name_falls_back_to_default() {
        assert_eq!(ApiKeyEntity::new("u1", None).name, "API Key");
        assert_eq!(ApiKeyEntity::new("u1", Some("  ".into())).name, "API Key");
        assert_eq!(ApiKeyEntity::new("u1", Some("ci".into())).name, "ci");
    }
}
