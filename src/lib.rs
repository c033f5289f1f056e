use config::Config;
use std::sync::Arc;

use database::{ApiKeyStore, UsageStore};
use ollama::ModelRuntime;
use rate_limit::{CounterStore, RateLimiter};
use usage::UsageTracker;

pub mod config;
pub mod database;
pub mod error;
pub mod middleware;
pub mod ollama;
pub mod rate_limit;
pub mod usage;
pub mod utils;

pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub api_keys: Arc<dyn ApiKeyStore>,
    pub usage: Arc<dyn UsageStore>,
    pub tracker: UsageTracker,
    pub limiter: RateLimiter,
    pub runtime: Arc<dyn ModelRuntime>,
}

impl AppState {
    pub fn new(
        config: Config,
        api_keys: Arc<dyn ApiKeyStore>,
        usage: Arc<dyn UsageStore>,
        counters: Arc<dyn CounterStore>,
        runtime: Arc<dyn ModelRuntime>,
    ) -> Self {
        let limiter = RateLimiter::from_config(counters, &config);
        let tracker = UsageTracker::new(usage.clone());
        Self {
            config,
            api_keys,
            usage,
            tracker,
            limiter,
            runtime,
        }
    }
}
