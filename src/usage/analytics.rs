// 用量统计
// 汇总在存储层完成，这里只负责拼装管理后台的报表

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::database::{DailyCount, UsageGroup, UsageStore, UsageTotals};
use crate::error::StoreError;

pub const DEFAULT_PERIOD_DAYS: i64 = 30;
pub const MAX_PERIOD_DAYS: i64 = 36_500;
pub const TREND_DAYS: i64 = 7;

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub active_users: i64,
    pub total_requests: i64,
    pub avg_response_time: i64,
    pub period_days: i64,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserUsage {
    pub user_id: String,
    pub request_count: i64,
    pub total_tokens: i64,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub avg_response_time: i64,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelUsage {
    pub model: String,
    pub request_count: i64,
    pub total_tokens: i64,
    pub avg_response_time: i64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct DailyTrend {
    pub date: String,
    pub requests: i64,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UsageReport {
    pub summary: UsageSummary,
    pub user_stats: Vec<UserUsage>,
    pub model_stats: Vec<ModelUsage>,
    pub daily_trends: Vec<DailyTrend>,
}

/// 统计周期起点；超出时间范围时退到最早可表示的时间
pub fn period_start(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    Duration::try_days(days)
        .and_then(|d| now.checked_sub_signed(d))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// 趋势窗口起点：含今天在内最近七个 UTC 日的零点
pub fn trend_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let first_day = now.date_naive() - Duration::days(TREND_DAYS - 1);
    first_day.and_time(chrono::NaiveTime::MIN).and_utc()
}

impl UsageReport {
    /// Queries the store for the `days` before `now` and the seven-day trend.
    pub async fn collect(
        store: &dyn UsageStore,
        days: i64,
        now: DateTime<Utc>,
    ) -> Result<Self, StoreError> {
        let since = period_start(now, days);
        let totals = store.totals_since(since).await?;
        let users = store.by_user_since(since).await?;
        let models = store.by_model_since(since).await?;
        let daily = store.daily_counts_since(trend_start(now)).await?;

        Ok(Self::assemble(totals, users, models, &daily, days, now))
    }

    /// Groups are expected in store order. Days missing from `daily` are
    /// reported with zero requests.
    pub fn assemble(
        totals: UsageTotals,
        users: Vec<UsageGroup>,
        models: Vec<UsageGroup>,
        daily: &[DailyCount],
        days: i64,
        now: DateTime<Utc>,
    ) -> Self {
        UsageReport {
            summary: UsageSummary {
                active_users: totals.active_users,
                total_requests: totals.requests,
                avg_response_time: totals.avg_response_time,
                period_days: days,
            },
            user_stats: users
                .into_iter()
                .map(|g| UserUsage {
                    user_id: g.key,
                    request_count: g.requests,
                    total_tokens: g.total_tokens,
                    prompt_tokens: g.prompt_tokens,
                    completion_tokens: g.completion_tokens,
                    avg_response_time: g.avg_response_time,
                })
                .collect(),
            model_stats: models
                .into_iter()
                .map(|g| ModelUsage {
                    model: g.key,
                    request_count: g.requests,
                    total_tokens: g.total_tokens,
                    avg_response_time: g.avg_response_time,
                })
                .collect(),
            daily_trends: daily_trends(daily, now.date_naive()),
        }
    }
}

fn daily_trends(daily: &[DailyCount], today: NaiveDate) -> Vec<DailyTrend> {
    (0..TREND_DAYS)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset);
            let requests = daily
                .iter()
                .find(|d| d.day == date)
                .map_or(0, |d| d.requests);
            DailyTrend {
                date: date.format("%Y-%m-%d").to_string(),
                requests,
            }
        })
        .collect()
}
