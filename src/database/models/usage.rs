// 用量记录实体
// 对应数据库中的 usage_metrics 表

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// 一次已完成模型调用的用量记录，写入后不再修改
#[derive(Debug, Clone, FromRow, PartialEq, Eq)]
pub struct UsageEvent {
    pub id: String,
    pub user_id: String,
    pub model: String,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
    pub response_time_ms: i64,
    pub endpoint: String,
    pub created_at: DateTime<Utc>,
}

/// 记录用量时的输入，未给出的 token 数按 0 处理
#[derive(Debug, Clone, Default)]
pub struct UsageEventInput {
    pub user_id: String,
    pub model: String,
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub response_time_ms: u64,
    pub endpoint: String,
}

/// 一段时间内的整体汇总
#[derive(Debug, Clone, Default, FromRow, PartialEq, Eq)]
pub struct UsageTotals {
    pub requests: i64,
    pub active_users: i64,
    /// 四舍五入后的平均耗时（毫秒）
    pub avg_response_time: i64,
}

/// 按用户或模型分组的汇总，`key` 为分组值
#[derive(Debug, Clone, FromRow, PartialEq, Eq)]
pub struct UsageGroup {
    pub key: String,
    pub requests: i64,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
    pub avg_response_time: i64,
}

/// 某个 UTC 日期的请求数
#[derive(Debug, Clone, FromRow, PartialEq, Eq)]
pub struct DailyCount {
    pub day: NaiveDate,
    pub requests: i64,
}

fn to_column(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl UsageEvent {
    pub fn from_input(input: UsageEventInput, created_at: DateTime<Utc>) -> Self {
        let prompt_tokens = to_column(input.prompt_tokens.unwrap_or(0));
        let completion_tokens = to_column(input.completion_tokens.unwrap_or(0));

        Self {
            id: Uuid::new_v4().to_string(),
            user_id: input.user_id,
            model: input.model,
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
            response_time_ms: to_column(input.response_time_ms),
            endpoint: input.endpoint,
            created_at,
        }
    }
}
