use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::ApiKeyEntity;

#[derive(Debug, Default, Deserialize)]
pub struct CreateKeyRequest {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateKeyRequest {
    pub is_active: bool,
}

/// 返回给调用方的密钥信息，不含所属用户
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyView {
    pub id: String,
    pub name: String,
    pub key: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_used: Option<DateTime<Utc>>,
}

impl From<ApiKeyEntity> for ApiKeyView {
    fn from(entity: ApiKeyEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            key: entity.key,
            is_active: entity.is_active,
            created_at: entity.created_at,
            last_used: entity.last_used,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyListResponse {
    pub api_keys: Vec<ApiKeyView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyResponse {
    pub api_key: ApiKeyView,
}

#[derive(Debug, Serialize)]
pub struct DeleteKeyResponse {
    pub success: bool,
}
