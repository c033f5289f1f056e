/// 速率限制计数器（每个凭证一条）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitCounter {
    pub key: String,
    pub count: u32,
    pub reset_at: i64, // Unix timestamp, milliseconds
}

/// 一次原子“检查并消费”的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumeOutcome {
    pub admitted: bool,
    /// 本次请求之前窗口内的计数
    pub count_before: u32,
    pub reset_at: i64,
}

/// 限流判定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { remaining: u32 },
    Denied,
    /// 存储不可用时放行
    FailOpen { remaining: u32 },
}

impl RateLimitDecision {
    pub fn allowed(&self) -> bool {
        !matches!(self, RateLimitDecision::Denied)
    }

    pub fn remaining(&self) -> u32 {
        match *self {
            RateLimitDecision::Allowed { remaining } => remaining,
            RateLimitDecision::Denied => 0,
            RateLimitDecision::FailOpen { remaining } => remaining,
        }
    }
}

// 窗口结束时间，超出 i64 时取上限
fn window_end(now: i64, window_ms: u64) -> i64 {
    now.saturating_add(i64::try_from(window_ms).unwrap_or(i64::MAX))
}

impl RateLimitCounter {
    pub fn new(key: &str, now: i64, window_ms: u64) -> Self {
        Self {
            key: key.to_string(),
            count: 0,
            reset_at: window_end(now, window_ms),
        }
    }

    /// Applies one gated request to the counter, in place.
    ///
    /// A window whose `reset_at` is at or before `now` is replaced by a fresh
    /// one anchored at `now`. A full window is left untouched.
    pub fn consume(&mut self, now: i64, limit: u32, window_ms: u64) -> ConsumeOutcome {
        if self.reset_at <= now {
            self.count = 0;
            self.reset_at = window_end(now, window_ms);
        }

        let count_before = self.count;
        if count_before >= limit {
            return ConsumeOutcome {
                admitted: false,
                count_before,
                reset_at: self.reset_at,
            };
        }

        self.count += 1;
        ConsumeOutcome {
            admitted: true,
            count_before,
            reset_at: self.reset_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_window_is_not_mutated() {
        let mut counter = RateLimitCounter::new("k", 0, 1000);
        for _ in 0..2 {
            assert!(counter.consume(10, 2, 1000).admitted);
        }
        let before = counter.clone();
        let outcome = counter.consume(20, 2, 1000);
        assert!(!outcome.admitted);
        assert_eq!(outcome.count_before, 2);
        assert_eq!(counter, before);
    }

    #[test]
    fn expired_window_is_anchored_at_observation() {
        let mut counter = RateLimitCounter::new("k", 0, 1000);
        counter.consume(0, 5, 1000);
        let outcome = counter.consume(4321, 5, 1000);
        assert!(outcome.admitted);
        assert_eq!(outcome.count_before, 0);
        assert_eq!(counter.reset_at, 5321);
        assert_eq!(counter.count, 1);
    }

    #[test]
    fn boundary_instant_starts_new_window() {
        let mut counter = RateLimitCounter::new("k", 0, 1000);
        counter.consume(0, 1, 1000);
        assert!(!counter.consume(999, 1, 1000).admitted);
        assert!(counter.consume(1000, 1, 1000).admitted);
        assert_eq!(counter.reset_at, 2000);
    }

    #[test]
    fn oversized_window_saturates() {
        let mut counter = RateLimitCounter::new("k", 1_000, u64::MAX);
        assert_eq!(counter.reset_at, i64::MAX);
        let outcome = counter.consume(i64::MAX - 1, 1, u64::MAX);
        assert!(outcome.admitted);
        assert_eq!(outcome.reset_at, i64::MAX);
    }

    #[test]
    fn decision_accessors() {
        assert!(RateLimitDecision::Allowed { remaining: 4 }.allowed());
        assert!(RateLimitDecision::FailOpen { remaining: 100 }.allowed());
        assert!(!RateLimitDecision::Denied.allowed());
        assert_eq!(RateLimitDecision::Denied.remaining(), 0);
        assert_eq!(RateLimitDecision::FailOpen { remaining: 100 }.remaining(), 100);
    }
}
