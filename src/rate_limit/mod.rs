// 限流模块
// 按 API 密钥的固定窗口计数，计数器存放在多实例共享的存储中

pub mod limiter;
pub mod model;
pub mod redis_store;
pub mod store;

pub use limiter::RateLimiter;
pub use model::{ConsumeOutcome, RateLimitCounter, RateLimitDecision};
pub use redis_store::RedisCounterStore;
pub use store::{CounterStore, MemoryCounterStore};
