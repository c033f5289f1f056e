use std::sync::Arc;

use async_trait::async_trait;
use redis::{Client as RedisClient, Script};

use super::model::ConsumeOutcome;
use super::store::CounterStore;
use crate::error::StoreError;

// KEYS[1] = 计数器键；ARGV = now, window_ms, limit
// 返回 {admitted, count_before, reset_at}
const CONSUME_SCRIPT: &str = r#"
local now = tonumber(ARGV[1])
local window = tonumber(ARGV[2])
local limit = tonumber(ARGV[3])

local count = tonumber(redis.call('HGET', KEYS[1], 'count'))
local reset_at = tonumber(redis.call('HGET', KEYS[1], 'reset_at'))
local dirty = false

if count == nil or reset_at == nil or reset_at <= now then
    count = 0
    reset_at = now + window
    dirty = true
end

if count >= limit then
    if dirty then
        redis.call('HSET', KEYS[1], 'count', count, 'reset_at', reset_at)
    end
    return {0, count, reset_at}
end

redis.call('HSET', KEYS[1], 'count', count + 1, 'reset_at', reset_at)
return {1, count, reset_at}
"#;

pub fn rate_limit_key(key: &str) -> String {
    format!("rate_limit:{}", key)
}

/// Redis 计数器存储
///
/// Each counter is a hash `rate_limit:{key}` holding `count` and `reset_at`
/// (unix milliseconds). The whole check-and-increment runs inside one Lua
/// script, so concurrent instances never over-admit.
pub struct RedisCounterStore {
    redis: Arc<RedisClient>,
    script: Script,
}

impl RedisCounterStore {
    pub fn new(redis: Arc<RedisClient>) -> Self {
        Self {
            redis,
            script: Script::new(CONSUME_SCRIPT),
        }
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn consume(
        &self,
        key: &str,
        now: i64,
        limit: u32,
        window_ms: u64,
    ) -> Result<ConsumeOutcome, StoreError> {
        let mut conn = self.redis.get_multiplexed_async_connection().await?;

        let (admitted, count_before, reset_at): (i64, i64, i64) = self
            .script
            .key(rate_limit_key(key))
            .arg(now)
            .arg(window_ms)
            .arg(limit)
            .invoke_async(&mut conn)
            .await?;

        let count_before = u32::try_from(count_before)
            .map_err(|_| StoreError::Corrupt(format!("negative count for {}", key)))?;

        Ok(ConsumeOutcome {
            admitted: admitted == 1,
            count_before,
            reset_at,
        })
    }
}
