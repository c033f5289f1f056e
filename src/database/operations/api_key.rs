// API 密钥存储
// 包含 api_keys 表的增删改查

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;

use crate::database::ApiKeyStore;
use crate::database::models::api_key::ApiKeyEntity;
use crate::error::StoreError;

pub struct ApiKeyOperation {
    db: Arc<PgPool>,
}

impl ApiKeyOperation {
    pub fn new(db: Arc<PgPool>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ApiKeyStore for ApiKeyOperation {
    async fn find_by_key(&self, key: &str) -> Result<Option<ApiKeyEntity>, StoreError> {
        let entity = sqlx::query_as::<_, ApiKeyEntity>(
            r#"
            SELECT id, user_id, name, key, is_active, created_at, last_used
            FROM api_keys
            WHERE key = $1
            "#,
        )
        .bind(key)
        .fetch_optional(&*self.db)
        .await?;

        Ok(entity)
    }

    async fn touch(&self, id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query("UPDATE api_keys SET last_used = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&*self.db)
            .await?;

        Ok(())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<ApiKeyEntity>, StoreError> {
        let keys = sqlx::query_as::<_, ApiKeyEntity>(
            r#"
            SELECT id, user_id, name, key, is_active, created_at, last_used
            FROM api_keys
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&*self.db)
        .await?;

        Ok(keys)
    }

    async fn insert(&self, entity: &ApiKeyEntity) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO api_keys (id, user_id, name, key, is_active, created_at, last_used)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&entity.id)
        .bind(&entity.user_id)
        .bind(&entity.name)
        .bind(&entity.key)
        .bind(entity.is_active)
        .bind(entity.created_at)
        .bind(entity.last_used)
        .execute(&*self.db)
        .await?;

        Ok(())
    }

    async fn set_active(
        &self,
        id: &str,
        user_id: &str,
        is_active: bool,
    ) -> Result<Option<ApiKeyEntity>, StoreError> {
        let entity = sqlx::query_as::<_, ApiKeyEntity>(
            r#"
            UPDATE api_keys SET is_active = $3
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, name, key, is_active, created_at, last_used
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(is_active)
        .fetch_optional(&*self.db)
        .await?;

        Ok(entity)
    }

    async fn delete(&self, id: &str, user_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM api_keys WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&*self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
