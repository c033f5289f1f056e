use axum::{
    Json,
    extract::{Query, State},
};
use chrono::Utc;
use serde::Deserialize;

use crate::{
    AppState,
    error::AppError,
    usage::{
        UsageReport,
        analytics::{DEFAULT_PERIOD_DAYS, MAX_PERIOD_DAYS},
    },
};

#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    pub days: Option<String>,
}

impl AnalyticsQuery {
    // 无法解析或超出 0..=MAX_PERIOD_DAYS 时使用默认周期
    fn period_days(&self) -> i64 {
        self.days
            .as_deref()
            .and_then(|d| d.trim().parse::<i64>().ok())
            .filter(|d| (0..=MAX_PERIOD_DAYS).contains(d))
            .unwrap_or(DEFAULT_PERIOD_DAYS)
    }
}

#[axum::debug_handler]
pub async fn analytics(
    State(state): State<AppState>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<UsageReport>, AppError> {
    let days = query.period_days();
    let report = UsageReport::collect(state.usage.as_ref(), days, Utc::now()).await?;
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_days_defaults() {
        let q = |days: Option<&str>| AnalyticsQuery {
            days: days.map(String::from),
        };
        assert_eq!(q(None).period_days(), 30);
        assert_eq!(q(Some("7")).period_days(), 7);
        assert_eq!(q(Some("abc")).period_days(), 30);
        assert_eq!(q(Some("-3")).period_days(), 30);
        assert_eq!(q(Some("36500")).period_days(), 36_500);
        assert_eq!(q(Some("100000000")).period_days(), 30);
    }
}
