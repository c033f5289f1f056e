// 用量模块
// token 估算、用量记录、统计汇总

pub mod analytics;
pub mod estimator;
pub mod tracker;

pub use analytics::UsageReport;
pub use estimator::estimate_tokens;
pub use tracker::UsageTracker;
